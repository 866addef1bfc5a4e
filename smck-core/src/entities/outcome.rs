//! Confirmation outcomes and the precedence rule that merges them.
//!
//! Three independent sources can report how a checkout ended: the payment
//! element's inline result, the backend verification action, and the
//! redirect status parameter observed on the landing screen. They can
//! contradict each other; [`OutcomeSignals::resolve`] merges them into one
//! answer.

use compact_str::CompactString;
use smck_sdk::objects::{IntentStatus, RedirectStatus, VerifyPaymentResponse};

/// The merged result of one confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Succeeded,
    /// The charge positively did not happen. The only outcome that re-arms
    /// the session for another attempt.
    Failed(CompactString),
    /// The processor is still working (`processing` / `requires_action`).
    Pending,
    /// The true outcome is unknown to the client. Resolved only by another
    /// status check, never by resubmitting.
    Indeterminate,
}

impl ConfirmationOutcome {
    /// Whether this outcome permits a fresh charge attempt.
    pub fn allows_resubmit(&self) -> bool {
        matches!(self, ConfirmationOutcome::Failed(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConfirmationOutcome::Succeeded | ConfirmationOutcome::Failed(_)
        )
    }
}

/// Map a backend verification response to an outcome.
///
/// An unknown backend answer maps to [`ConfirmationOutcome::Indeterminate`],
/// never to `Failed`: only a positive `not_charged` may unlock
/// resubmission.
pub fn outcome_from_verification(resp: &VerifyPaymentResponse) -> ConfirmationOutcome {
    if resp.verified || resp.already_processed {
        return ConfirmationOutcome::Succeeded;
    }
    if resp.not_charged {
        return ConfirmationOutcome::Failed("payment was not charged".into());
    }
    match resp.status {
        IntentStatus::Processing | IntentStatus::RequiresAction => ConfirmationOutcome::Pending,
        _ => ConfirmationOutcome::Indeterminate,
    }
}

/// The three outcome sources for one checkout, in precedence order.
///
/// `server` is `None` when the verification action could not be reached at
/// all, which is the only situation in which an unverified redirect status
/// of `succeeded` is trusted.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSignals {
    /// Backend verification result, when the backend answered.
    pub server: Option<ConfirmationOutcome>,
    /// The element's inline confirmation result.
    pub inline: Option<ConfirmationOutcome>,
    /// The redirect status parameter, when the checkout went through a
    /// redirect.
    pub redirect: Option<RedirectStatus>,
}

impl OutcomeSignals {
    /// Merge the signals: server verification outranks the SDK inline
    /// result, which outranks an unverified redirect status.
    pub fn resolve(&self) -> ConfirmationOutcome {
        if let Some(server) = &self.server {
            if server.is_terminal() || *server == ConfirmationOutcome::Pending {
                return server.clone();
            }
            // The backend answered but does not know either; fall through
            // to the weaker signals, which can still claim success.
        }

        if let Some(inline) = &self.inline {
            if inline.is_terminal() {
                return inline.clone();
            }
        }

        // Redirect status is a fallback of last resort: only trusted when
        // the server could not be reached.
        if self.server.is_none() && self.redirect == Some(RedirectStatus::Succeeded) {
            return ConfirmationOutcome::Succeeded;
        }

        match (&self.server, &self.inline) {
            (Some(s), _) => s.clone(),
            (None, Some(i)) => i.clone(),
            (None, None) => ConfirmationOutcome::Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smck_sdk::objects::PaymentRecord;
    use uuid::Uuid;

    fn verification(
        verified: bool,
        not_charged: bool,
        status: IntentStatus,
    ) -> VerifyPaymentResponse {
        VerifyPaymentResponse {
            verified,
            already_processed: false,
            not_charged,
            status,
            payment: None,
        }
    }

    #[test]
    fn verified_maps_to_succeeded() {
        let resp = verification(true, false, IntentStatus::Succeeded);
        assert_eq!(
            outcome_from_verification(&resp),
            ConfirmationOutcome::Succeeded
        );
    }

    #[test]
    fn already_processed_counts_as_succeeded() {
        let resp = VerifyPaymentResponse {
            verified: false,
            already_processed: true,
            not_charged: false,
            status: IntentStatus::Succeeded,
            payment: Some(PaymentRecord {
                id: Uuid::from_u128(1),
                intent_id: "pi_1".into(),
                amount: rust_decimal::Decimal::new(500, 2),
                tip_amount: rust_decimal::Decimal::ZERO,
                status: IntentStatus::Succeeded,
                created_at: 1_700_000_000,
            }),
        };
        assert_eq!(
            outcome_from_verification(&resp),
            ConfirmationOutcome::Succeeded
        );
    }

    #[test]
    fn unknown_maps_to_indeterminate_never_failed() {
        let resp = verification(false, false, IntentStatus::Unknown);
        assert_eq!(
            outcome_from_verification(&resp),
            ConfirmationOutcome::Indeterminate
        );

        let resp = verification(false, false, IntentStatus::RequiresPaymentMethod);
        assert_eq!(
            outcome_from_verification(&resp),
            ConfirmationOutcome::Indeterminate
        );
    }

    #[test]
    fn not_charged_is_a_positive_failure() {
        let resp = verification(false, true, IntentStatus::Canceled);
        assert!(outcome_from_verification(&resp).allows_resubmit());
    }

    #[test]
    fn processing_maps_to_pending() {
        let resp = verification(false, false, IntentStatus::Processing);
        assert_eq!(outcome_from_verification(&resp), ConfirmationOutcome::Pending);
    }

    #[test]
    fn server_success_overrides_local_error() {
        let signals = OutcomeSignals {
            server: Some(ConfirmationOutcome::Succeeded),
            inline: Some(ConfirmationOutcome::Failed("network blip".into())),
            redirect: None,
        };
        assert_eq!(signals.resolve(), ConfirmationOutcome::Succeeded);
    }

    #[test]
    fn inline_success_outranks_redirect() {
        let signals = OutcomeSignals {
            server: Some(ConfirmationOutcome::Indeterminate),
            inline: Some(ConfirmationOutcome::Succeeded),
            redirect: Some(RedirectStatus::Failed),
        };
        assert_eq!(signals.resolve(), ConfirmationOutcome::Succeeded);
    }

    #[test]
    fn redirect_success_only_trusted_without_server() {
        // Server unreachable: the redirect parameter is the last resort.
        let signals = OutcomeSignals {
            server: None,
            inline: None,
            redirect: Some(RedirectStatus::Succeeded),
        };
        assert_eq!(signals.resolve(), ConfirmationOutcome::Succeeded);

        // Server answered "don't know": the unverified redirect does not win.
        let signals = OutcomeSignals {
            server: Some(ConfirmationOutcome::Indeterminate),
            inline: None,
            redirect: Some(RedirectStatus::Succeeded),
        };
        assert_eq!(signals.resolve(), ConfirmationOutcome::Indeterminate);
    }

    #[test]
    fn no_signals_is_indeterminate() {
        assert_eq!(
            OutcomeSignals::default().resolve(),
            ConfirmationOutcome::Indeterminate
        );
    }
}
