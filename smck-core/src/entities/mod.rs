pub mod outcome;
pub mod session;

pub use outcome::{outcome_from_verification, ConfirmationOutcome, OutcomeSignals};
pub use session::{CheckoutSession, FormReadiness};
