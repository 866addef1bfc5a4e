//! Timing parameters for the confirmation flow.

use std::time::Duration;

/// Every delay and bound the confirmation flow uses, as one configurable
/// struct instead of magic numbers scattered through the drivers.
#[derive(Debug, Clone)]
pub struct ConfirmTiming {
    /// How long to wait for the element's own `Ready` event before forcing
    /// the form to ready anyway. A deliberate liveness override: some
    /// element builds never fire the event.
    pub element_ready_fallback: Duration,
    /// Delay before the single automatic re-mount after a load error.
    pub reload_retry_delay: Duration,
    /// Grace period before status-checking after a browser security
    /// exception, so in-flight SDK network activity can settle.
    pub security_grace: Duration,
    /// Spacing between automatic status checks.
    pub status_poll_interval: Duration,
    /// How many status polls the landing screen makes before giving up on
    /// a still-processing payment.
    pub max_poll_attempts: u32,
}

impl Default for ConfirmTiming {
    fn default() -> Self {
        Self {
            element_ready_fallback: Duration::from_secs(8),
            reload_retry_delay: Duration::from_secs(2),
            security_grace: Duration::from_secs(2),
            status_poll_interval: Duration::from_secs(3),
            max_poll_attempts: 5,
        }
    }
}
