//! One checkout attempt and its resubmission guard.

use compact_str::CompactString;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Whether the third-party-rendered payment form can accept a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormReadiness {
    Loading,
    Ready,
    Error(CompactString),
}

impl FormReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, FormReadiness::Ready)
    }
}

/// One attempt to pay: binds a processor payment intent (via its client
/// secret) to the platform's payment record and the amounts involved.
///
/// The session lives in memory for the lifetime of one checkout screen and
/// is never persisted by the client. Its `ever_submitted` flag is the single
/// source of truth for resubmission eligibility: once set, a second charge
/// attempt is forbidden until the backend positively confirms the first one
/// failed.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    client_secret: CompactString,
    payment_record_id: Option<Uuid>,
    amount: Decimal,
    tip_amount: Decimal,
    connected_account_id: Option<CompactString>,
    created_at: time::OffsetDateTime,
    ever_submitted: bool,
}

impl CheckoutSession {
    pub fn new(client_secret: impl Into<CompactString>, amount: Decimal, tip_amount: Decimal) -> Self {
        Self {
            client_secret: client_secret.into(),
            payment_record_id: None,
            amount,
            tip_amount,
            connected_account_id: None,
            created_at: time::OffsetDateTime::now_utc(),
            ever_submitted: false,
        }
    }

    pub fn with_payment_record_id(mut self, id: Uuid) -> Self {
        self.payment_record_id = Some(id);
        self
    }

    /// Scope the session to a direct-deposit recipient account.
    pub fn with_connected_account(mut self, account_id: impl Into<CompactString>) -> Self {
        self.connected_account_id = Some(account_id.into());
        self
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn payment_record_id(&self) -> Option<Uuid> {
        self.payment_record_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn tip_amount(&self) -> Decimal {
        self.tip_amount
    }

    pub fn connected_account_id(&self) -> Option<&str> {
        self.connected_account_id.as_deref()
    }

    pub fn created_at(&self) -> time::OffsetDateTime {
        self.created_at
    }

    /// The payment intent id embedded in the client secret
    /// (`pi_123_secret_abc` → `pi_123`), when the secret has the expected
    /// shape.
    pub fn intent_id(&self) -> Option<CompactString> {
        intent_id_from_secret(&self.client_secret)
    }

    /// Whether a charge attempt has ever been made for this session.
    pub fn ever_submitted(&self) -> bool {
        self.ever_submitted
    }

    /// Record that a charge attempt is being made. Monotonic except through
    /// [`clear_after_confirmed_failure`].
    ///
    /// [`clear_after_confirmed_failure`]: CheckoutSession::clear_after_confirmed_failure
    pub fn mark_submitted(&mut self) {
        self.ever_submitted = true;
    }

    /// Re-arm the session for another charge attempt.
    ///
    /// Callers may only do this on a *positive* failure confirmation: an
    /// explicit card/validation error from the element, or a backend
    /// verification that says the intent was not charged. An unknown
    /// outcome never unlocks resubmission.
    pub fn clear_after_confirmed_failure(&mut self) {
        self.ever_submitted = false;
    }
}

/// Extract the payment intent id from a client secret of the form
/// `{intent_id}_secret_{nonce}`.
pub fn intent_id_from_secret(secret: &str) -> Option<CompactString> {
    let (intent, _) = secret.split_once("_secret_")?;
    if intent.is_empty() {
        return None;
    }
    Some(intent.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_id_derived_from_secret() {
        assert_eq!(
            intent_id_from_secret("pi_123_secret_abc").as_deref(),
            Some("pi_123")
        );
        assert_eq!(intent_id_from_secret("_secret_abc"), None);
        assert_eq!(intent_id_from_secret("pi_123"), None);
    }

    #[test]
    fn guard_is_monotonic_until_confirmed_failure() {
        let mut session =
            CheckoutSession::new("pi_123_secret_abc", Decimal::new(500, 2), Decimal::ZERO);
        assert!(!session.ever_submitted());

        session.mark_submitted();
        assert!(session.ever_submitted());

        // A second mark changes nothing.
        session.mark_submitted();
        assert!(session.ever_submitted());

        session.clear_after_confirmed_failure();
        assert!(!session.ever_submitted());
    }
}
