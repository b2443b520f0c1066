//! Local delivery of synchronized events.
//!
//! A [`DeliveryStream`] waits until the earliest pending event is due on the
//! local clock and hands it out as a [`Delivery`]. Dropping the delivery
//! marks the event handled and removes it from the pending queue, so the
//! bookkeeping runs even if the caller's handling code panics.

use std::sync::Arc;
use std::time::Duration;

use lockstep_sync_core::EventKey;
use lockstep_sync_types::{EventId, Timestamp};

use crate::clock::Clock;
use crate::ingest::PeerShared;
use crate::stats::NodeStats;

/// The single consumer of a node's pending events.
pub struct DeliveryStream {
    shared: Arc<PeerShared>,
    clock: Arc<dyn Clock>,
    idle_wait: Duration,
    retention: f64,
    stats: Arc<NodeStats>,
}

impl DeliveryStream {
    pub(crate) fn new(
        shared: Arc<PeerShared>,
        clock: Arc<dyn Clock>,
        idle_wait: Duration,
        retention: f64,
        stats: Arc<NodeStats>,
    ) -> Self {
        Self {
            shared,
            clock,
            idle_wait,
            retention,
            stats,
        }
    }

    /// Wait for the next due event.
    ///
    /// Events come out in `(due time, id)` order. If an earlier event arrives
    /// while waiting, it is delivered first. Never returns while nothing is
    /// pending.
    pub async fn next(&mut self) -> Delivery<'_> {
        loop {
            let earliest = {
                let state = self.shared.state.lock();
                state
                    .earliest()
                    .map(|(key, payload)| (key.clone(), payload.clone()))
            };

            let Some((key, payload)) = earliest else {
                self.wait(self.idle_wait).await;
                continue;
            };

            let wait = key.timestamp.as_secs() - self.clock.now();
            if wait > 0.0 {
                let nap = Duration::try_from_secs_f64(wait)
                    .unwrap_or(self.idle_wait)
                    .min(self.idle_wait);
                // Below timer resolution the event is due now
                if !nap.is_zero() {
                    self.wait(nap).await;
                    continue;
                }
            }

            return Delivery {
                stream: self,
                key,
                payload,
                lateness: (-wait).max(0.0),
            };
        }
    }

    async fn wait(&self, limit: Duration) {
        let _ = tokio::time::timeout(limit, self.shared.signal.notified()).await;
    }

    fn complete(&self, key: &EventKey) {
        let now = self.clock.now();
        self.shared.state.lock().complete(key, now, self.retention);
        self.stats.record_delivery();
    }
}

/// One due event, borrowed from its stream until dropped.
pub struct Delivery<'a> {
    stream: &'a mut DeliveryStream,
    key: EventKey,
    payload: Vec<u8>,
    lateness: f64,
}

impl Delivery<'_> {
    /// Seconds between the due time and the moment it was handed out.
    pub fn lateness(&self) -> f64 {
        self.lateness
    }

    /// Event payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Event id.
    pub fn id(&self) -> &EventId {
        &self.key.id
    }

    /// Due time on the local clock.
    pub fn due_time(&self) -> Timestamp {
        self.key.timestamp
    }
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        self.stream.complete(&self.key);
    }
}

impl std::fmt::Debug for Delivery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.key.id)
            .field("due_time", &self.key.timestamp)
            .field("lateness", &self.lateness)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
