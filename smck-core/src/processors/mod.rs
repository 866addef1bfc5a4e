pub mod confirm;
pub mod landing;

pub use confirm::{ConfirmationDriver, SubmitOutcome};
pub use landing::{LandingError, LandingReconciler};
