//! Redirect-landing reconciliation.
//!
//! After a step-up-authentication redirect the checkout screen is gone; the
//! landing screen re-enters the confirmation flow from cold start with
//! nothing but the query parameters the redirect carried. The
//! LandingReconciler is responsible for:
//! - Refusing to conclude anything when no payment identifier survived
//! - Polling the backend verification action with a bounded budget
//! - Trusting the redirect status parameter only when the backend is
//!   unreachable
//! - Ending a still-processing payment optimistically instead of stranding
//!   the user in an indefinite pending state

use smck_sdk::objects::redirect::{PaymentReference, RedirectContinuation};
use smck_sdk::objects::verify::VerifyPaymentRequest;
use tracing::{debug, info, warn};

use crate::entities::{outcome_from_verification, ConfirmationOutcome, OutcomeSignals};
use crate::utils::ConfirmTiming;
use crate::verify::StatusBackend;

/// Errors the landing screen must surface instead of an outcome.
#[derive(Debug, thiserror::Error)]
pub enum LandingError {
    /// Neither a payment intent id nor a payment record id survived the
    /// redirect. Never assumed to be a success, whatever the redirect
    /// status claims.
    #[error("no payment information found in the redirect")]
    MissingPaymentReference,
}

/// Re-derives a confirmation outcome from a parsed redirect continuation.
pub struct LandingReconciler<B> {
    backend: B,
    timing: ConfirmTiming,
}

impl<B: StatusBackend> LandingReconciler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            timing: ConfirmTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: ConfirmTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Resolve the outcome of the redirected checkout.
    ///
    /// Follows the same precedence rule as the checkout screen: an explicit
    /// backend answer wins; the redirect status parameter is a fallback of
    /// last resort, trusted only when the backend cannot be reached at all.
    pub async fn reconcile(
        &self,
        continuation: &RedirectContinuation,
    ) -> Result<ConfirmationOutcome, LandingError> {
        let reference = continuation
            .payment_reference()
            .ok_or(LandingError::MissingPaymentReference)?;

        let mut request = match reference {
            PaymentReference::Intent(intent_id) => {
                VerifyPaymentRequest::new(Some(intent_id), continuation.payment_id)
            }
            PaymentReference::Record(record_id) => {
                VerifyPaymentRequest::new(None, Some(record_id))
            }
        };
        if let Some(status) = continuation.redirect_status {
            request = request.with_redirect_status(status);
        }

        let mut still_processing = false;

        for attempt in 1..=self.timing.max_poll_attempts {
            match self.backend.verify(&request).await {
                Ok(resp) => {
                    let outcome = outcome_from_verification(&resp);
                    match outcome {
                        ConfirmationOutcome::Succeeded | ConfirmationOutcome::Failed(_) => {
                            info!(attempt, outcome = ?outcome, "backend resolved the redirect");
                            return Ok(outcome);
                        }
                        ConfirmationOutcome::Pending => {
                            still_processing = true;
                            debug!(attempt, "payment still settling; polling again");
                        }
                        ConfirmationOutcome::Indeterminate => {
                            // The backend answered but does not know; an
                            // unverified redirect status cannot override it.
                            return Ok(ConfirmationOutcome::Indeterminate);
                        }
                    }
                }
                Err(err) if err.is_unreachable() => {
                    let fallback = OutcomeSignals {
                        server: None,
                        inline: None,
                        redirect: continuation.redirect_status,
                    };
                    if fallback.resolve() == ConfirmationOutcome::Succeeded {
                        warn!(error = %err, "backend unreachable; trusting redirect status as last resort");
                        return Ok(ConfirmationOutcome::Succeeded);
                    }
                    warn!(attempt, error = %err, "backend unreachable; polling again");
                }
                Err(err) => {
                    warn!(error = %err, "verification rejected the request");
                    return Ok(ConfirmationOutcome::Indeterminate);
                }
            }

            if attempt < self.timing.max_poll_attempts {
                tokio::time::sleep(self.timing.status_poll_interval).await;
            }
        }

        if still_processing {
            // Optimistic terminal state after the poll budget: the payment
            // was accepted for processing and failures downstream are rare.
            // Flagged as a product decision, not settled behavior.
            warn!("poll budget exhausted while still processing; reporting success optimistically");
            Ok(ConfirmationOutcome::Succeeded)
        } else {
            Ok(ConfirmationOutcome::Indeterminate)
        }
    }
}
