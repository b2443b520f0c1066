//! Leader-side broadcast planning.
//!
//! On every tick the leader decides which of its pending events go out:
//! - events older than `now - stale_after` are dropped for good
//! - the contiguous prefix up to `now + horizon` is selected
//! - the selection is cut into chunks of at most `max_events_per_broadcast`
//!
//! Selected events stay queued, so every tick re-sends them until they fall
//! out of the stale window. That repetition is the protocol's only defence
//! against message loss.

use lockstep_sync_types::{Timestamp, WireEvent};

use crate::queue::TimestampedEventQueue;

/// Tunables for [`select_for_broadcast`] and [`chunk_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPolicy {
    /// Events this far in the past (seconds) are no longer worth sending.
    pub stale_after: f64,
    /// Events further than this in the future (seconds) are held back.
    pub horizon: f64,
    /// Upper bound on events per broadcast message.
    pub max_events_per_broadcast: usize,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            stale_after: 1.0,
            horizon: 1.0,
            max_events_per_broadcast: 4,
        }
    }
}

/// Result of one planning pass over the leader queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// How many stale events were dropped from the queue.
    pub pruned: usize,
    /// Events to broadcast, in ascending timestamp order.
    pub events: Vec<WireEvent>,
}

/// Prune stale events and pick the ones inside the broadcast horizon.
///
/// Mutates the queue only by pruning; selected events remain queued.
pub fn select_for_broadcast(
    queue: &mut TimestampedEventQueue<Vec<u8>>,
    now: f64,
    policy: &BroadcastPolicy,
) -> Selection {
    let pruned = queue.discard_older_than(Timestamp::from_secs(now - policy.stale_after));
    let horizon = Timestamp::from_secs(now + policy.horizon);
    let events = queue
        .iter()
        .take_while(|(key, _)| key.timestamp <= horizon)
        .map(|(key, payload)| WireEvent::new(key.timestamp, key.id.clone(), payload.clone()))
        .collect();
    Selection { pruned, events }
}

/// Split a selection into broadcast-sized chunks.
///
/// Always yields at least one chunk: an empty selection becomes a single
/// empty chunk, so peers keep receiving the leader's clock. A zero chunk
/// size is treated as one.
pub fn chunk_events(events: Vec<WireEvent>, max_per_chunk: usize) -> Vec<Vec<WireEvent>> {
    if events.is_empty() {
        return vec![Vec::new()];
    }
    let size = max_per_chunk.max(1);
    let mut chunks = Vec::with_capacity(events.len().div_ceil(size));
    let mut iter = events.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}
