//! Verification API client (checkout client → SpotMe backend).

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::verify::{
    ConfirmedPaymentNotice, VerifyPaymentRequest, VerifyPaymentResponse,
};

/// Typed HTTP client for the backend's payment verification actions.
///
/// The verification endpoint authoritatively answers whether a payment
/// intent was actually charged; the confirmed endpoint is a best-effort
/// notification that an intent confirmed successfully on the client.
#[derive(Debug, Clone)]
pub struct VerificationClient {
    http: Client,
    base_url: Url,
}

impl VerificationClient {
    /// Create a new `VerificationClient`.
    ///
    /// * `base_url` – root URL of the SpotMe backend
    ///   (e.g. `https://api.spotme.example`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/payments/verify` – ask the backend for the true state
    /// of a payment intent.
    pub async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        let url = self.base_url.join("/api/v1/payments/verify")?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/payments/confirmed` – record a client-side confirmed
    /// intent. Callers treat failures here as non-fatal.
    pub async fn notify_confirmed(
        &self,
        notice: &ConfirmedPaymentNotice,
    ) -> Result<(), ClientError> {
        let url = self.base_url.join("/api/v1/payments/confirmed")?;

        let resp = self.http.post(url).json(notice).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
