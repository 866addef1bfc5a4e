//! Request/response types for the backend payment-verification action.
//!
//! The verification action is the authoritative tie-breaker for a checkout:
//! it answers "was payment intent X actually charged" when the client-side
//! signal is ambiguous or missing.

use super::{IntentStatus, RedirectStatus};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload for the payment verification action.
///
/// At least one of `intent_id` / `payment_record_id` identifies the payment;
/// `session_id` and `redirect_status` are forwarded as supporting context
/// when the caller arrived via a processor redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_status: Option<RedirectStatus>,
}

impl VerifyPaymentRequest {
    /// Build a request from whichever payment identifiers are at hand.
    pub fn new(intent_id: Option<CompactString>, payment_record_id: Option<Uuid>) -> Self {
        Self {
            intent_id,
            payment_record_id,
            session_id: None,
            redirect_status: None,
        }
    }

    pub fn with_redirect_status(mut self, status: RedirectStatus) -> Self {
        self.redirect_status = Some(status);
        self
    }
}

/// Response returned by the payment verification action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    /// The backend confirmed the intent was charged.
    pub verified: bool,
    /// The charge was already recorded by an earlier webhook or notification.
    #[serde(default)]
    pub already_processed: bool,
    /// The backend positively confirmed that no charge occurred.
    #[serde(default)]
    pub not_charged: bool,
    /// Raw processor status of the intent as the backend last saw it.
    pub status: IntentStatus,
    /// The platform's payment record, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecord>,
}

/// The platform's own record of a payment, as returned by verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub intent_id: CompactString,
    pub amount: rust_decimal::Decimal,
    pub tip_amount: rust_decimal::Decimal,
    pub status: IntentStatus,
    /// Unix timestamp of when the record was created.
    pub created_at: i64,
}

/// Best-effort notification that an intent confirmed successfully inline.
///
/// Delivery failure is non-fatal; the backend's webhook pipeline remains the
/// durable record of the charge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmedPaymentNotice {
    pub intent_id: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_record_id: Option<Uuid>,
}
