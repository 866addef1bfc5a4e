pub mod timing;

pub use timing::ConfirmTiming;
