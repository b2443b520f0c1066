//! Monotonic clocks.
//!
//! Every timestamp in the protocol is "seconds on some node's monotonic
//! clock". Nodes never compare clocks directly; peers estimate the leader's
//! offset from broadcasts instead.

use tokio::time::Instant;

/// Source of monotonic time in seconds.
pub trait Clock: Send + Sync + 'static {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Follows tokio's paused test clock, so timing tests run deterministically
/// under `#[tokio::test(start_paused = true)]`. A fixed skew models devices
/// whose clocks started at different points.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
    skew: f64,
}

impl MonotonicClock {
    /// Clock reading zero now.
    pub fn new() -> Self {
        Self::with_skew(0.0)
    }

    /// Clock reading `skew` seconds now.
    pub fn with_skew(skew: f64) -> Self {
        Self {
            origin: Instant::now(),
            skew,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() + self.skew
    }
}
