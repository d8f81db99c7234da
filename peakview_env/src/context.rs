//! Clock abstraction shared by the environment layer.

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// Source of time for cache expiry and load timestamps.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `std::time` and `tokio::time`
/// - **Simulation**: a manually advanced clock, so expiry is deterministic
#[async_trait]
pub trait PeakViewContext: Send + Sync + 'static {
    /// Monotonic time since the context was created.
    fn now(&self) -> Duration;

    /// Wall-clock time, used for load timestamps.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In simulation this advances the virtual clock.
    async fn sleep(&self, duration: Duration);
}
