pub mod redirect;
pub mod verify;

pub use redirect::{RedirectContinuation, RedirectStatus};
pub use verify::{
    ConfirmedPaymentNotice, PaymentRecord, VerifyPaymentRequest, VerifyPaymentResponse,
};

use serde::{Deserialize, Serialize};

/// Processor-side status of a payment intent.
///
/// Decoding is lenient: any status string the client does not know maps to
/// [`IntentStatus::Unknown`] rather than failing deserialization, so a new
/// processor status can never brick an in-flight checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresAction,
    RequiresPaymentMethod,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentStatus::Succeeded => write!(f, "succeeded"),
            IntentStatus::Processing => write!(f, "processing"),
            IntentStatus::RequiresAction => write!(f, "requires_action"),
            IntentStatus::RequiresPaymentMethod => write!(f, "requires_payment_method"),
            IntentStatus::Canceled => write!(f, "canceled"),
            IntentStatus::Unknown => write!(f, "unknown"),
        }
    }
}
