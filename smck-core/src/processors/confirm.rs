//! The payment confirmation driver.
//!
//! The ConfirmationDriver is responsible for:
//! - Mounting the hosted payment element and tracking form readiness
//! - Enforcing the at-most-one-charge guard across submissions
//! - Interpreting the element's inline confirmation result
//! - Resolving every ambiguous local signal through the backend
//!   verification action before declaring anything
//! - Discarding ready/error events from superseded mount attempts
//!
//! The driver owns one [`CheckoutSession`] and dies with the screen; there
//! is no cross-session state.

use compact_str::CompactString;
use smck_sdk::objects::verify::{ConfirmedPaymentNotice, VerifyPaymentRequest};
use smck_sdk::objects::IntentStatus;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::element::{
    ConfirmSignal, ElementError, ElementEvent, InlineConfirmation, PaymentElement,
    RedirectPreference,
};
use crate::entities::{outcome_from_verification, CheckoutSession, ConfirmationOutcome, FormReadiness};
use crate::error::CheckoutError;
use crate::utils::ConfirmTiming;
use crate::verify::StatusBackend;

/// What a submission resolved to, plus the user-facing guidance when the
/// resolution is not a clean success.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub outcome: ConfirmationOutcome,
    pub error: Option<CheckoutError>,
}

impl SubmitOutcome {
    fn clean(outcome: ConfirmationOutcome) -> Self {
        Self {
            outcome,
            error: None,
        }
    }

    /// Whether the user may submit again, as opposed to being routed to a
    /// status check. Derived strictly from the outcome; an unknown outcome
    /// never allows a retry.
    pub fn retry_allowed(&self) -> bool {
        self.outcome.allows_resubmit()
    }
}

/// Event channel of one mount attempt, tagged with the attempt's
/// generation so late events from a superseded mount are discarded.
struct MountedEvents {
    generation: u64,
    rx: mpsc::Receiver<ElementEvent>,
}

/// Drives one [`CheckoutSession`] through the hosted payment element to a
/// single terminal outcome.
pub struct ConfirmationDriver<E, B> {
    session: CheckoutSession,
    element: E,
    backend: B,
    timing: ConfirmTiming,
    readiness: FormReadiness,
    form_complete: bool,
    events: Option<MountedEvents>,
    mount_generation: u64,
    auto_reload_used: bool,
}

impl<E: PaymentElement, B: StatusBackend> ConfirmationDriver<E, B> {
    pub fn new(session: CheckoutSession, element: E, backend: B) -> Self {
        Self {
            session,
            element,
            backend,
            timing: ConfirmTiming::default(),
            readiness: FormReadiness::Loading,
            form_complete: false,
            events: None,
            mount_generation: 0,
            auto_reload_used: false,
        }
    }

    pub fn with_timing(mut self, timing: ConfirmTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn session(&self) -> &CheckoutSession {
        &self.session
    }

    pub fn readiness(&self) -> &FormReadiness {
        &self.readiness
    }

    /// The element's own judgement of whether the form inputs are
    /// submittable, from the latest `Change` event seen.
    pub fn form_complete(&self) -> bool {
        self.form_complete
    }

    /// Mount the payment element and wait for it to become ready.
    ///
    /// On a load error the mount is retried exactly once after a short
    /// delay, but only while no submission has ever been attempted:
    /// remounting a form whose underlying intent may already be settled is
    /// never worth the risk.
    pub async fn initialize(&mut self) -> &FormReadiness {
        self.mount_once().await;

        if matches!(self.readiness, FormReadiness::Error(_))
            && !self.session.ever_submitted()
            && !self.auto_reload_used
        {
            self.auto_reload_used = true;
            info!("payment form failed to load; retrying once");
            tokio::time::sleep(self.timing.reload_retry_delay).await;
            self.mount_once().await;
        }

        &self.readiness
    }

    async fn mount_once(&mut self) {
        self.mount_generation += 1;
        let generation = self.mount_generation;
        self.readiness = FormReadiness::Loading;
        self.form_complete = false;
        self.events = None;

        let rx = match self
            .element
            .mount(
                self.session.client_secret(),
                self.session.connected_account_id(),
            )
            .await
        {
            Ok(rx) => rx,
            Err(err) => {
                warn!(generation, error = %err, "payment element mount failed");
                if generation == self.mount_generation {
                    self.readiness = FormReadiness::Error(err.to_string().into());
                }
                return;
            }
        };

        let mut events = MountedEvents { generation, rx };
        let mut form_complete = false;

        let readiness = match tokio::time::timeout(
            self.timing.element_ready_fallback,
            wait_for_ready(&mut events.rx, &mut form_complete),
        )
        .await
        {
            Ok(readiness) => readiness,
            Err(_) => {
                // Liveness override: some element builds never fire ready.
                warn!(generation, "element never reported ready; forcing ready after fallback");
                FormReadiness::Ready
            }
        };

        if generation != self.mount_generation {
            debug!(
                generation,
                current = self.mount_generation,
                "discarding result of superseded mount attempt"
            );
            return;
        }

        debug!(generation, readiness = ?readiness, "payment element mounted");
        self.readiness = readiness;
        self.form_complete = form_complete;
        self.events = Some(events);
    }

    /// Apply any element events that arrived since the last call,
    /// dropping the channel of a superseded mount.
    fn drain_element_events(&mut self) {
        let Some(events) = self.events.as_mut() else {
            return;
        };
        if events.generation != self.mount_generation {
            debug!("dropping event channel of superseded mount attempt");
            self.events = None;
            return;
        }
        while let Ok(event) = events.rx.try_recv() {
            match event {
                ElementEvent::Ready => self.readiness = FormReadiness::Ready,
                ElementEvent::LoadError(reason) => {
                    self.readiness = FormReadiness::Error(reason)
                }
                ElementEvent::Change { complete } => self.form_complete = complete,
            }
        }
    }

    /// Attempt to complete the checkout.
    ///
    /// At most one call per session ever reaches the element's confirm; any
    /// call after that routes to a status check instead, until a positive
    /// failure confirmation re-arms the session.
    pub async fn submit(&mut self) -> SubmitOutcome {
        self.drain_element_events();

        if self.session.ever_submitted() {
            debug!("submission already attempted; routing to status check");
            let outcome = self.check_status().await;
            return self.with_guidance(outcome);
        }

        if !self.readiness.is_ready() {
            return SubmitOutcome {
                outcome: ConfirmationOutcome::Failed("payment form is not ready".into()),
                error: Some(CheckoutError::Validation(
                    "the payment form is not ready yet".into(),
                )),
            };
        }

        self.session.mark_submitted();
        info!(intent = ?self.session.intent_id(), "confirming payment");

        let confirmed = self
            .element
            .confirm(self.session.client_secret(), RedirectPreference::IfRequired)
            .await;

        match confirmed {
            Ok(ConfirmSignal::Completed(inline)) => self.interpret_inline(inline).await,
            Ok(ConfirmSignal::RedirectInFlight) => {
                // The landing screen re-derives the outcome from the
                // redirect parameters; nothing to record here.
                info!("redirect in flight; landing screen will resolve the outcome");
                SubmitOutcome::clean(ConfirmationOutcome::Pending)
            }
            Err(err) if err.is_retry_safe() => {
                // Positive rejection from the processor: no charge happened.
                self.session.clear_after_confirmed_failure();
                info!(error = %err, "card rejected; retry allowed");
                SubmitOutcome {
                    outcome: ConfirmationOutcome::Failed(err.to_string().into()),
                    error: Some(CheckoutError::Validation(err.to_string().into())),
                }
            }
            Err(err) => {
                if err.is_security_restriction() {
                    warn!(error = %err, "security restriction during confirmation; waiting out grace period");
                    tokio::time::sleep(self.timing.security_grace).await;
                } else {
                    warn!(error = %err, "local error during confirmation; resolving via status check");
                }
                self.resolve_after_local_error(&err).await
            }
        }
    }

    async fn interpret_inline(&mut self, inline: InlineConfirmation) -> SubmitOutcome {
        match inline.status {
            IntentStatus::Succeeded => {
                info!(intent = %inline.intent_id, "payment confirmed inline");
                self.notify_confirmed_best_effort(&inline.intent_id).await;
                SubmitOutcome::clean(ConfirmationOutcome::Succeeded)
            }
            IntentStatus::Processing | IntentStatus::RequiresAction => {
                debug!(status = %inline.status, "confirmation still settling; delayed status check");
                tokio::time::sleep(self.timing.status_poll_interval).await;
                let outcome = self.check_status().await;
                self.with_guidance(outcome)
            }
            other => {
                // Any inline status outside the known set resolves through
                // the backend; it is authoritative.
                debug!(status = %other, "unexpected inline status; resolving via status check");
                let outcome = self.check_status().await;
                self.with_guidance(outcome)
            }
        }
    }

    /// An explicit non-card error or caught platform exception: the client
    /// cannot trust that no charge occurred, so the backend decides.
    async fn resolve_after_local_error(&mut self, err: &ElementError) -> SubmitOutcome {
        match self.check_status().await {
            ConfirmationOutcome::Succeeded => {
                info!("backend confirms the charge despite the local error");
                SubmitOutcome::clean(ConfirmationOutcome::Succeeded)
            }
            ConfirmationOutcome::Failed(reason) => {
                SubmitOutcome::clean(ConfirmationOutcome::Failed(reason))
            }
            ConfirmationOutcome::Pending => SubmitOutcome::clean(ConfirmationOutcome::Pending),
            ConfirmationOutcome::Indeterminate => SubmitOutcome {
                outcome: ConfirmationOutcome::Indeterminate,
                error: Some(classify_element_error(err)),
            },
        }
    }

    /// Query the backend for the true state of the underlying intent.
    ///
    /// An unreachable backend maps to `Indeterminate`, never to `Failed`;
    /// the resubmission guard is cleared only on a positive failure.
    pub async fn check_status(&mut self) -> ConfirmationOutcome {
        let request = VerifyPaymentRequest::new(
            self.session.intent_id(),
            self.session.payment_record_id(),
        );

        match self.backend.verify(&request).await {
            Ok(resp) => {
                let outcome = outcome_from_verification(&resp);
                if outcome.allows_resubmit() {
                    self.session.clear_after_confirmed_failure();
                }
                debug!(outcome = ?outcome, "status check resolved");
                outcome
            }
            Err(err) => {
                warn!(error = %err, "status check failed; outcome stays unknown");
                ConfirmationOutcome::Indeterminate
            }
        }
    }

    async fn notify_confirmed_best_effort(&self, intent_id: &str) {
        let notice = ConfirmedPaymentNotice {
            intent_id: intent_id.into(),
            payment_record_id: self.session.payment_record_id(),
        };
        if let Err(err) = self.backend.notify_confirmed(&notice).await {
            warn!(error = %err, "failed to notify backend of confirmed intent");
        }
    }

    fn with_guidance(&self, outcome: ConfirmationOutcome) -> SubmitOutcome {
        let error = match &outcome {
            ConfirmationOutcome::Indeterminate => Some(CheckoutError::ServerUnknown(
                CompactString::from(
                    "a charge may have gone through; check the payment status before retrying",
                ),
            )),
            _ => None,
        };
        SubmitOutcome { outcome, error }
    }
}

fn classify_element_error(err: &ElementError) -> CheckoutError {
    match err {
        ElementError::Card(msg) | ElementError::Validation(msg) => {
            CheckoutError::Validation(msg.clone())
        }
        ElementError::Network(msg) => CheckoutError::TransientNetwork(msg.clone()),
        ElementError::SecurityRestriction(msg) => CheckoutError::SecurityRestriction(msg.clone()),
        ElementError::Processor(msg) | ElementError::Unexpected(msg) => {
            CheckoutError::ServerUnknown(msg.clone())
        }
    }
}

/// Wait for the element to declare itself ready or failed, recording any
/// interleaved `Change` events. A closed channel never resolves; the
/// caller's fallback timeout decides instead.
async fn wait_for_ready(
    rx: &mut mpsc::Receiver<ElementEvent>,
    form_complete: &mut bool,
) -> FormReadiness {
    loop {
        match rx.recv().await {
            Some(ElementEvent::Ready) => return FormReadiness::Ready,
            Some(ElementEvent::LoadError(reason)) => return FormReadiness::Error(reason),
            Some(ElementEvent::Change { complete }) => *form_complete = complete,
            None => return std::future::pending::<FormReadiness>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ConfirmSignal, ElementError, ElementEvent, InlineConfirmation};
    use crate::testing::{
        card_declined, not_charged_response, processing_response, unknown_response,
        verified_response, FakeBackend, FakeElement,
    };
    use crate::verify::BackendError;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn session() -> CheckoutSession {
        CheckoutSession::new("pi_123_secret_abc", Decimal::new(2500, 2), Decimal::new(250, 2))
    }

    fn inline(status: IntentStatus) -> ConfirmSignal {
        ConfirmSignal::Completed(InlineConfirmation {
            intent_id: "pi_123".into(),
            status,
        })
    }

    async fn ready_driver(
        element: FakeElement,
        backend: FakeBackend,
    ) -> ConfirmationDriver<FakeElement, FakeBackend> {
        let mut driver = ConfirmationDriver::new(session(), element, backend);
        driver.initialize().await;
        assert!(driver.readiness().is_ready());
        driver
    }

    #[tokio::test(start_paused = true)]
    async fn card_declined_resets_guard_and_allows_retry() {
        let element = FakeElement::new();
        element.script_confirm(Err(card_declined())).await;
        element
            .script_confirm(Ok(inline(IntentStatus::Succeeded)))
            .await;

        let mut driver = ready_driver(element, FakeBackend::new()).await;

        let first = driver.submit().await;
        assert!(matches!(first.outcome, ConfirmationOutcome::Failed(_)));
        assert!(first.retry_allowed());
        assert!(matches!(first.error, Some(CheckoutError::Validation(_))));
        assert!(!driver.session().ever_submitted());

        // The retry is a real second charge attempt, not a status check.
        let second = driver.submit().await;
        assert_eq!(second.outcome, ConfirmationOutcome::Succeeded);
        assert_eq!(driver.element.confirm_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn security_exception_resolved_by_verification() {
        let element = FakeElement::new();
        element
            .script_confirm(Err(ElementError::SecurityRestriction(
                "storage access denied".into(),
            )))
            .await;
        let backend = FakeBackend::new();
        backend.script_verify(Ok(verified_response())).await;

        let mut driver = ready_driver(element, backend).await;
        let started = tokio::time::Instant::now();

        let result = driver.submit().await;

        // Server verification outranks the local exception.
        assert_eq!(result.outcome, ConfirmationOutcome::Succeeded);
        assert_eq!(driver.element.confirm_calls(), 1);
        // The grace delay ran before the status check.
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_submits_never_charge_twice() {
        let element = FakeElement::new();
        element
            .script_confirm(Err(ElementError::Network("connection reset".into())))
            .await;
        let backend = FakeBackend::new();
        backend.script_verify(Ok(unknown_response())).await;
        backend.script_verify(Ok(unknown_response())).await;
        backend.script_verify(Ok(unknown_response())).await;

        let mut driver = ready_driver(element, backend).await;

        let first = driver.submit().await;
        assert_eq!(first.outcome, ConfirmationOutcome::Indeterminate);
        assert!(matches!(first.error, Some(CheckoutError::TransientNetwork(_))));
        assert!(driver.session().ever_submitted());

        // Every further submit routes to a status check, never to confirm.
        for _ in 0..2 {
            let next = driver.submit().await;
            assert_eq!(next.outcome, ConfirmationOutcome::Indeterminate);
            assert!(matches!(next.error, Some(CheckoutError::ServerUnknown(_))));
            assert!(!next.retry_allowed());
            assert!(driver.session().ever_submitted());
        }
        assert_eq!(driver.element.confirm_calls(), 1);
        assert_eq!(driver.backend.verify_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_confirmation_rearms_the_session() {
        let element = FakeElement::new();
        element
            .script_confirm(Err(ElementError::Processor("gateway timeout".into())))
            .await;
        let backend = FakeBackend::new();
        backend.script_verify(Ok(not_charged_response())).await;

        let mut driver = ready_driver(element, backend).await;

        let result = driver.submit().await;
        assert!(matches!(result.outcome, ConfirmationOutcome::Failed(_)));
        assert!(result.retry_allowed());
        assert!(!driver.session().ever_submitted());
    }

    #[tokio::test(start_paused = true)]
    async fn requires_action_schedules_one_delayed_status_check() {
        let element = FakeElement::new();
        element
            .script_confirm(Ok(inline(IntentStatus::RequiresAction)))
            .await;
        let backend = FakeBackend::new();
        backend.script_verify(Ok(verified_response())).await;

        let mut driver = ready_driver(element, backend).await;
        let started = tokio::time::Instant::now();

        let result = driver.submit().await;
        assert_eq!(result.outcome, ConfirmationOutcome::Succeeded);
        assert_eq!(driver.backend.verify_calls(), 1);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn inline_success_notifies_backend_best_effort() {
        let element = FakeElement::new();
        element
            .script_confirm(Ok(inline(IntentStatus::Succeeded)))
            .await;

        let mut driver = ready_driver(element, FakeBackend::new()).await;
        let result = driver.submit().await;

        assert_eq!(result.outcome, ConfirmationOutcome::Succeeded);
        let notices = driver.backend.notices().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].intent_id, "pi_123");
    }

    #[tokio::test(start_paused = true)]
    async fn notify_failure_is_not_fatal() {
        let element = FakeElement::new();
        element
            .script_confirm(Ok(inline(IntentStatus::Succeeded)))
            .await;
        let backend = FakeBackend::new();
        backend.fail_next_notifies(1);

        let mut driver = ready_driver(element, backend).await;
        let result = driver.submit().await;

        assert_eq!(result.outcome, ConfirmationOutcome::Succeeded);
        assert!(driver.backend.notices().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_in_flight_changes_nothing_locally() {
        let element = FakeElement::new();
        element
            .script_confirm(Ok(ConfirmSignal::RedirectInFlight))
            .await;

        let mut driver = ready_driver(element, FakeBackend::new()).await;
        let result = driver.submit().await;

        assert_eq!(result.outcome, ConfirmationOutcome::Pending);
        assert_eq!(driver.backend.verify_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn load_error_retries_mount_exactly_once() {
        let element = FakeElement::new();
        element
            .script_mount(Ok(vec![ElementEvent::LoadError(
                "script blocked".into(),
            )]))
            .await;
        element.script_mount(Ok(vec![ElementEvent::Ready])).await;

        let mut driver = ConfirmationDriver::new(session(), element, FakeBackend::new());
        let started = tokio::time::Instant::now();
        driver.initialize().await;

        assert!(driver.readiness().is_ready());
        assert_eq!(driver.element.mount_calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn mount_retry_suppressed_after_submission() {
        let element = FakeElement::new();
        element
            .script_confirm(Err(ElementError::Network("offline".into())))
            .await;
        let backend = FakeBackend::new();
        backend.script_verify(Ok(unknown_response())).await;

        let mut driver = ready_driver(element, backend).await;
        driver.submit().await;
        assert!(driver.session().ever_submitted());

        // A later re-initialize that fails must not auto-remount: the
        // underlying intent may already be settled.
        driver
            .element
            .script_mount(Ok(vec![ElementEvent::LoadError("blocked".into())]))
            .await;
        let mounts_before = driver.element.mount_calls();
        driver.initialize().await;

        assert!(matches!(driver.readiness(), FormReadiness::Error(_)));
        assert_eq!(driver.element.mount_calls(), mounts_before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_element_is_forced_ready_by_fallback() {
        let element = FakeElement::new();
        element.script_mount(Ok(vec![])).await;

        let mut driver = ConfirmationDriver::new(session(), element, FakeBackend::new());
        let started = tokio::time::Instant::now();
        driver.initialize().await;

        assert!(driver.readiness().is_ready());
        assert!(started.elapsed() >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn change_events_track_form_completeness() {
        let element = FakeElement::new();
        element
            .script_mount(Ok(vec![
                ElementEvent::Ready,
                ElementEvent::Change { complete: true },
            ]))
            .await;
        element
            .script_confirm(Ok(inline(IntentStatus::Succeeded)))
            .await;

        let mut driver = ConfirmationDriver::new(session(), element, FakeBackend::new());
        driver.initialize().await;
        assert!(!driver.form_complete());

        driver.submit().await;
        assert!(driver.form_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_before_ready_is_rejected_without_charging() {
        let element = FakeElement::new();
        element
            .script_mount(Ok(vec![ElementEvent::LoadError("blocked".into())]))
            .await;
        element
            .script_mount(Ok(vec![ElementEvent::LoadError("blocked".into())]))
            .await;

        let mut driver = ConfirmationDriver::new(session(), element, FakeBackend::new());
        driver.initialize().await;
        assert!(matches!(driver.readiness(), FormReadiness::Error(_)));

        let result = driver.submit().await;
        assert!(matches!(result.outcome, ConfirmationOutcome::Failed(_)));
        assert_eq!(driver.element.confirm_calls(), 0);
        assert!(!driver.session().ever_submitted());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_backend_keeps_outcome_unknown() {
        let element = FakeElement::new();
        element
            .script_confirm(Err(ElementError::Unexpected("sdk threw".into())))
            .await;
        let backend = FakeBackend::new();
        backend
            .script_verify(Err(BackendError::Unreachable("dns failure".into())))
            .await;

        let mut driver = ready_driver(element, backend).await;
        let result = driver.submit().await;

        assert_eq!(result.outcome, ConfirmationOutcome::Indeterminate);
        assert!(driver.session().ever_submitted());
    }
}
