//! The redirect continuation: checkout state serialized through the
//! step-up-authentication redirect.
//!
//! When the payment element cannot confirm inline (3-D Secure and friends)
//! the processor sends the browser to a landing URL. The only state that
//! survives that hop is a handful of query parameters. This module treats
//! them as an explicit serialized continuation: written once onto the
//! `return_url` before confirmation, parsed once at landing-screen entry.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Redirect status appended to the landing URL by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::str::FromStr for RedirectStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "succeeded" => RedirectStatus::Succeeded,
            "processing" => RedirectStatus::Processing,
            "requires_payment_method" => RedirectStatus::RequiresPaymentMethod,
            "failed" => RedirectStatus::Failed,
            _ => RedirectStatus::Unknown,
        })
    }
}

/// Identifier the landing screen can verify a payment by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    /// Processor-side payment intent id (`pi_…`).
    Intent(CompactString),
    /// The platform's own payment record id.
    Record(Uuid),
}

/// The full set of query parameters carried across the redirect boundary.
///
/// Everything is optional at the wire level; [`payment_reference`] decides
/// whether enough survived to identify the payment at all.
///
/// [`payment_reference`]: RedirectContinuation::payment_reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectContinuation {
    pub payment_id: Option<Uuid>,
    pub payment_intent: Option<CompactString>,
    pub redirect_status: Option<RedirectStatus>,
    pub amount: Option<Decimal>,
    pub tip_amount: Option<Decimal>,
    pub need_title: Option<String>,
    pub stripe_account: Option<CompactString>,
}

impl RedirectContinuation {
    /// Parse the continuation out of a landing URL.
    ///
    /// Parsing is lenient: an absent or malformed parameter becomes `None`
    /// rather than an error, because the redirect is assembled by two
    /// different parties (the platform writes its keys onto the
    /// `return_url`, the processor appends its own) and neither can be
    /// trusted to be complete.
    pub fn from_url(url: &Url) -> Self {
        let mut out = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "payment_id" => out.payment_id = value.parse().ok(),
                "payment_intent" => out.payment_intent = Some(value.as_ref().into()),
                "redirect_status" => out.redirect_status = value.parse().ok(),
                "amount" => out.amount = value.parse().ok(),
                "tip_amount" => out.tip_amount = value.parse().ok(),
                "need_title" => out.need_title = Some(value.into_owned()),
                "stripe_account" => out.stripe_account = Some(value.as_ref().into()),
                _ => {}
            }
        }
        out
    }

    /// Write the platform-owned parameters onto a `return_url` before
    /// confirmation. The processor appends `payment_intent` and
    /// `redirect_status` on its side of the hop, so those keys are never
    /// written here.
    pub fn apply_to(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if let Some(id) = self.payment_id {
            pairs.append_pair("payment_id", &id.to_string());
        }
        if let Some(amount) = self.amount {
            pairs.append_pair("amount", &amount.to_string());
        }
        if let Some(tip) = self.tip_amount {
            pairs.append_pair("tip_amount", &tip.to_string());
        }
        if let Some(title) = &self.need_title {
            pairs.append_pair("need_title", title);
        }
        if let Some(account) = &self.stripe_account {
            pairs.append_pair("stripe_account", account);
        }
    }

    /// Whichever payment identifier survived the redirect, preferring the
    /// processor intent id over the platform record id.
    ///
    /// `None` means the landing screen has no payment information at all
    /// and must report that, never assume success.
    pub fn payment_reference(&self) -> Option<PaymentReference> {
        if let Some(intent) = &self.payment_intent {
            return Some(PaymentReference::Intent(intent.clone()));
        }
        self.payment_id.map(PaymentReference::Record)
    }
}
