//! The status backend seam: who answers "was this intent actually charged".

use async_trait::async_trait;
use compact_str::CompactString;
use smck_sdk::client::{ClientError, VerificationClient};
use smck_sdk::objects::verify::{
    ConfirmedPaymentNotice, VerifyPaymentRequest, VerifyPaymentResponse,
};

/// Errors from the status backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached (transport failure or 5xx). The
    /// payment outcome stays unknown; this is also the only condition under
    /// which an unverified redirect status may be trusted.
    #[error("verification backend unreachable: {0}")]
    Unreachable(CompactString),
    /// The backend answered but rejected or garbled the exchange.
    #[error("verification backend error: {0}")]
    Other(CompactString),
}

impl BackendError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BackendError::Unreachable(_))
    }
}

/// The backend verification action, abstracted so the drivers can be tested
/// against a fake.
#[async_trait]
pub trait StatusBackend: Send + Sync {
    /// Authoritatively resolve the state of a payment intent.
    async fn verify(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError>;

    /// Best-effort notification of a client-side confirmed intent.
    async fn notify_confirmed(&self, notice: &ConfirmedPaymentNotice) -> Result<(), BackendError>;
}

#[async_trait]
impl StatusBackend for VerificationClient {
    async fn verify(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        self.verify_payment(request).await.map_err(map_client_error)
    }

    async fn notify_confirmed(&self, notice: &ConfirmedPaymentNotice) -> Result<(), BackendError> {
        VerificationClient::notify_confirmed(self, notice)
            .await
            .map_err(map_client_error)
    }
}

fn map_client_error(err: ClientError) -> BackendError {
    if err.is_unreachable() {
        BackendError::Unreachable(err.to_string().into())
    } else {
        BackendError::Other(err.to_string().into())
    }
}
