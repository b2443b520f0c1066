//! Clock offset estimation between a peer and the current leader.
//!
//! Every leader broadcast carries the leader's monotonic clock reading. A
//! peer combines it with the transport's ping estimate and its own clock to
//! track how far apart the two clocks are, smoothing heavily so that network
//! jitter does not move delivery times around.

use lockstep_sync_types::Timestamp;

/// Weight of the previous estimate in the moving average.
pub const SMOOTHING: f64 = 0.99;

/// Exponentially smoothed `leader_clock - local_clock` estimate.
#[derive(Debug, Clone, Default)]
pub struct ClockOffsetEstimator {
    smoothed: Option<f64>,
}

impl ClockOffsetEstimator {
    /// Create an estimator with no observations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one observation and return the updated estimate.
    ///
    /// The leader's clock at receipt is taken as `leader_time + ping`, with
    /// the whole ping added rather than half of it.
    pub fn observe(&mut self, leader_time: f64, ping: f64, local_time: f64) -> f64 {
        let true_leader_time = leader_time + ping;
        let raw = true_leader_time - local_time;
        let next = match self.smoothed {
            None => raw,
            Some(prev) => SMOOTHING * prev + (1.0 - SMOOTHING) * raw,
        };
        self.smoothed = Some(next);
        next
    }

    /// Current estimate, if any broadcast was observed this epoch.
    pub fn offset(&self) -> Option<f64> {
        self.smoothed
    }

    /// Convert a leader-clock timestamp to the local clock.
    pub fn to_local(&self, leader_timestamp: Timestamp) -> Option<Timestamp> {
        self.smoothed
            .map(|offset| leader_timestamp.shifted(-offset))
    }

    /// Forget everything (leader changed).
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}
