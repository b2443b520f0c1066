//! Peer-side protocol state.
//!
//! A [`PeerState`] is everything a node knows about the current leader term:
//! which epoch it belongs to, the clock offset to that leader, the events
//! waiting to be delivered (on the local clock) and the ids it recently
//! delivered. Any change of epoch wipes all of it; the last epoch observed
//! wins and nothing from a superseded term is carried over.

use lockstep_sync_types::{DeviceId, EventId, LeaderBroadcast, LeaderEpoch, Timestamp, WireEvent};

use crate::offset::ClockOffsetEstimator;
use crate::queue::{EventKey, QueuedEvent, TimestampedEventQueue};

/// What a single broadcast did to the peer state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// The broadcast came from a different leader term than the last one.
    pub epoch_changed: bool,
    /// Events newly added to the pending queue.
    pub inserted: usize,
    /// Events skipped because they were already pending or delivered.
    pub duplicates: usize,
    /// Smoothed clock offset after this broadcast.
    pub offset: f64,
}

/// Per-node view of the current leader term.
#[derive(Debug, Default)]
pub struct PeerState {
    last_epoch: Option<LeaderEpoch>,
    offset: ClockOffsetEstimator,
    pending: TimestampedEventQueue<Vec<u8>>,
    handled: TimestampedEventQueue<()>,
}

impl PeerState {
    /// Create an empty state that has not heard from any leader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one leader broadcast received at local time `now`.
    ///
    /// `leader` and `ping` come from the transport's peer info for the
    /// message; the epoch is `(leader, broadcast token)`.
    pub fn ingest(
        &mut self,
        leader: &DeviceId,
        ping: f64,
        now: f64,
        broadcast: LeaderBroadcast,
    ) -> IngestOutcome {
        let epoch = LeaderEpoch::new(leader.clone(), broadcast.leader_epoch_token);
        let epoch_changed = self.last_epoch.as_ref() != Some(&epoch);
        if epoch_changed {
            self.reset();
            self.last_epoch = Some(epoch);
        }

        let offset = self.offset.observe(broadcast.leader_time, ping, now);

        let mut inserted = 0;
        let mut duplicates = 0;
        for event in broadcast.events {
            let WireEvent(timestamp, id, payload) = event;
            if self.handled.has(&id) {
                duplicates += 1;
                continue;
            }
            let due = timestamp.shifted(-offset);
            if self.pending.add(QueuedEvent::new(due, id, payload)) {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        IngestOutcome {
            epoch_changed,
            inserted,
            duplicates,
            offset,
        }
    }

    /// The next event to deliver, with its local due time.
    pub fn earliest(&self) -> Option<(&EventKey, &Vec<u8>)> {
        self.pending.peek_earliest()
    }

    /// Record that `key` was delivered at local time `now`.
    ///
    /// The event leaves the pending queue and its id enters the handled
    /// cache, which is then trimmed to the last `retention` seconds. A key
    /// that is no longer pending belongs to a superseded term and is not
    /// recorded.
    pub fn complete(&mut self, key: &EventKey, now: f64, retention: f64) {
        if self.pending.remove(key).is_some() {
            self.handled
                .add(QueuedEvent::new(Timestamp::from_secs(now), key.id.clone(), ()));
        }
        self.handled
            .discard_older_than(Timestamp::from_secs(now - retention));
    }

    /// Forget the current term entirely.
    pub fn reset(&mut self) {
        self.last_epoch = None;
        self.offset.reset();
        self.pending.clear();
        self.handled.clear();
    }

    /// Epoch of the last broadcast ingested.
    pub fn last_epoch(&self) -> Option<&LeaderEpoch> {
        self.last_epoch.as_ref()
    }

    /// Current smoothed offset to the leader's clock.
    pub fn smoothed_offset(&self) -> Option<f64> {
        self.offset.offset()
    }

    /// Whether `id` was delivered recently.
    pub fn is_handled(&self, id: &EventId) -> bool {
        self.handled.has(id)
    }

    /// Whether `id` is waiting for delivery.
    pub fn is_pending(&self, id: &EventId) -> bool {
        self.pending.has(id)
    }

    /// Number of events waiting for delivery.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of ids in the handled cache.
    pub fn handled_len(&self) -> usize {
        self.handled.len()
    }
}
