//! The payment element collaborator: a thin seam over the third-party
//! hosted card form.
//!
//! The real element is a remote-rendered script with callback-style events;
//! this trait narrows it to the two calls the confirmation driver needs so
//! the state machine can be unit-tested with a fake implementation.

use async_trait::async_trait;
use compact_str::CompactString;
use smck_sdk::objects::IntentStatus;
use tokio::sync::mpsc;

/// Events emitted by a mounted element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementEvent {
    /// The input surface can accept a submission.
    Ready,
    /// The element failed to come up (script load error, invalid or
    /// expired secret, browser security restriction).
    LoadError(CompactString),
    /// The user edited the form; `complete` is the element's own judgement
    /// of whether the inputs are submittable.
    Change { complete: bool },
}

/// What to tell the element about redirects when confirming.
///
/// The driver always asks [`IfRequired`]: synchronous confirmation is
/// preferred, the element may still force a redirect for step-up
/// authentication.
///
/// [`IfRequired`]: RedirectPreference::IfRequired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPreference {
    IfRequired,
    Always,
}

/// An inline confirmation that completed without a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineConfirmation {
    pub intent_id: CompactString,
    pub status: IntentStatus,
}

/// What came back from a confirm call that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmSignal {
    Completed(InlineConfirmation),
    /// No error and no outcome object: the element has started a redirect
    /// and the landing screen will re-derive the outcome.
    RedirectInFlight,
}

/// Mount-time failures reported synchronously by the element.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("payment form script failed to load: {0}")]
    ScriptLoad(CompactString),
    #[error("invalid or expired client secret: {0}")]
    InvalidSecret(CompactString),
    #[error("browser blocked the payment form: {0}")]
    SecurityRestriction(CompactString),
}

/// Confirm-time failures, split by what they allow the caller to do next.
///
/// `Card` and `Validation` are positive rejections from the processor: no
/// charge happened and retrying is safe. Everything else leaves the true
/// outcome unknown and must be resolved through a status check.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ElementError {
    #[error("card error: {0}")]
    Card(CompactString),
    #[error("validation error: {0}")]
    Validation(CompactString),
    #[error("network error during confirmation: {0}")]
    Network(CompactString),
    #[error("processor error: {0}")]
    Processor(CompactString),
    /// A caught platform exception attributable to browser storage/security
    /// restrictions (iframe storage access and similar).
    #[error("browser security restriction: {0}")]
    SecurityRestriction(CompactString),
    /// Any other caught platform exception.
    #[error("unexpected element failure: {0}")]
    Unexpected(CompactString),
}

impl ElementError {
    /// Positive rejection: the processor said no and no charge occurred.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, ElementError::Card(_) | ElementError::Validation(_))
    }

    /// Needs the grace delay before status-checking, to let any in-flight
    /// SDK network activity settle.
    pub fn is_security_restriction(&self) -> bool {
        matches!(self, ElementError::SecurityRestriction(_))
    }
}

/// The hosted payment form, reduced to what the confirmation driver needs.
#[async_trait]
pub trait PaymentElement: Send + Sync {
    /// Mount the hosted form bound to `client_secret`, optionally scoped to
    /// a connected recipient account. Returns the event channel the mounted
    /// element reports through; `Ready`/`LoadError` arrive there, not as
    /// the return value.
    async fn mount(
        &self,
        client_secret: &str,
        connected_account: Option<&str>,
    ) -> Result<mpsc::Receiver<ElementEvent>, MountError>;

    /// Ask the mounted form to confirm the bound intent.
    async fn confirm(
        &self,
        client_secret: &str,
        preference: RedirectPreference,
    ) -> Result<ConfirmSignal, ElementError>;
}
