//! User-facing error taxonomy for the confirmation flow.
//!
//! The split that matters to the user is binary: "you can safely retry"
//! versus "do not retry, check status instead". Only [`Validation`] sits on
//! the safe side; every other variant means the true outcome may be a
//! completed charge.
//!
//! [`Validation`]: CheckoutError::Validation

use compact_str::CompactString;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckoutError {
    /// Card or form input was rejected. No charge happened; retrying is
    /// safe.
    #[error("your card was declined or the form is incomplete: {0}")]
    Validation(CompactString),

    /// A network problem interrupted confirmation. The charge may or may
    /// not have gone through.
    #[error("a network problem interrupted the payment: {0}")]
    TransientNetwork(CompactString),

    /// The browser blocked the payment form (storage access, iframe
    /// restrictions).
    #[error("your browser blocked the payment form: {0}")]
    SecurityRestriction(CompactString),

    /// The backend genuinely cannot say whether the charge happened.
    #[error("the payment status could not be determined: {0}")]
    ServerUnknown(CompactString),
}

impl CheckoutError {
    /// Whether the user may submit the form again, as opposed to being
    /// routed to a status check.
    pub fn retry_is_safe(&self) -> bool {
        matches!(self, CheckoutError::Validation(_))
    }
}
