//! In-memory test doubles for the two collaborator seams.
//!
//! Both fakes play back scripted results in order and count the calls they
//! receive, so tests can assert not just the merged outcome but how many
//! charge attempts and status checks actually happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use compact_str::CompactString;
use smck_sdk::objects::verify::{
    ConfirmedPaymentNotice, VerifyPaymentRequest, VerifyPaymentResponse,
};
use smck_sdk::objects::IntentStatus;
use tokio::sync::{mpsc, Mutex};

use crate::element::{
    ConfirmSignal, ElementEvent, ElementError, MountError, PaymentElement, RedirectPreference,
};
use crate::verify::{BackendError, StatusBackend};

/// A scripted payment element.
///
/// Each `mount` call pops the next mount script (a list of events to emit,
/// or a mount error); each `confirm` call pops the next confirm script.
/// An unscripted `mount` reports `Ready`; an unscripted `confirm` fails
/// with an unexpected-element error so a test that under-scripts cannot
/// silently "charge".
#[derive(Default)]
pub struct FakeElement {
    mounts: Mutex<VecDeque<Result<Vec<ElementEvent>, MountError>>>,
    confirms: Mutex<VecDeque<Result<ConfirmSignal, ElementError>>>,
    mount_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    // Kept alive so an event channel with no scripted events stays open
    // instead of closing and short-circuiting ready-wait loops.
    held_senders: Mutex<Vec<mpsc::Sender<ElementEvent>>>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_mount(&self, script: Result<Vec<ElementEvent>, MountError>) {
        self.mounts.lock().await.push_back(script);
    }

    pub async fn script_confirm(&self, script: Result<ConfirmSignal, ElementError>) {
        self.confirms.lock().await.push_back(script);
    }

    /// How many charge attempts the element has seen.
    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn mount_calls(&self) -> usize {
        self.mount_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentElement for FakeElement {
    async fn mount(
        &self,
        _client_secret: &str,
        _connected_account: Option<&str>,
    ) -> Result<mpsc::Receiver<ElementEvent>, MountError> {
        self.mount_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .mounts
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(vec![ElementEvent::Ready]));
        let events = script?;

        let (tx, rx) = mpsc::channel(events.len().max(1) + 4);
        for event in events {
            let _ = tx.try_send(event);
        }
        self.held_senders.lock().await.push(tx);
        Ok(rx)
    }

    async fn confirm(
        &self,
        _client_secret: &str,
        _preference: RedirectPreference,
    ) -> Result<ConfirmSignal, ElementError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.confirms.lock().await.pop_front().unwrap_or(Err(
            ElementError::Unexpected("no scripted confirm result".into()),
        ))
    }
}

/// A scripted status backend.
#[derive(Default)]
pub struct FakeBackend {
    verifies: Mutex<VecDeque<Result<VerifyPaymentResponse, BackendError>>>,
    verify_calls: AtomicUsize,
    notices: Mutex<Vec<ConfirmedPaymentNotice>>,
    fail_notify: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_verify(&self, script: Result<VerifyPaymentResponse, BackendError>) {
        self.verifies.lock().await.push_back(script);
    }

    /// Make the next `n` notify calls fail.
    pub fn fail_next_notifies(&self, n: usize) {
        self.fail_notify.store(n, Ordering::SeqCst);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub async fn notices(&self) -> Vec<ConfirmedPaymentNotice> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl StatusBackend for FakeBackend {
    async fn verify(
        &self,
        _request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verifies.lock().await.pop_front().unwrap_or(Err(
            BackendError::Unreachable("no scripted verify response".into()),
        ))
    }

    async fn notify_confirmed(&self, notice: &ConfirmedPaymentNotice) -> Result<(), BackendError> {
        let remaining = self.fail_notify.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_notify.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Unreachable("notify failed".into()));
        }
        self.notices.lock().await.push(notice.clone());
        Ok(())
    }
}

/// A verification response that positively confirms the charge.
pub fn verified_response() -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        verified: true,
        already_processed: false,
        not_charged: false,
        status: IntentStatus::Succeeded,
        payment: None,
    }
}

/// A verification response that positively confirms no charge happened.
pub fn not_charged_response() -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        verified: false,
        already_processed: false,
        not_charged: true,
        status: IntentStatus::Canceled,
        payment: None,
    }
}

/// A verification response for a payment that is still settling.
pub fn processing_response() -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        verified: false,
        already_processed: false,
        not_charged: false,
        status: IntentStatus::Processing,
        payment: None,
    }
}

/// A verification response where the backend genuinely does not know.
pub fn unknown_response() -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        verified: false,
        already_processed: false,
        not_charged: false,
        status: IntentStatus::Unknown,
        payment: None,
    }
}

/// Shorthand for scripting element errors.
pub fn card_declined() -> ElementError {
    ElementError::Card(CompactString::from("your card was declined"))
}
