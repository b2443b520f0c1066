//! Timestamped event queue for Lockstep Sync.
//!
//! This module provides a deduplicating min-priority container with:
//! - Ordering by `(timestamp, id)` so the earliest event is always at the front
//! - O(1) membership by id through a set kept in lockstep with the ordered store
//! - Bulk pruning of everything older than a threshold
//!
//! The same type backs three different roles: the leader's outgoing queue,
//! each peer's pending-delivery queue, and the peer's "recently handled"
//! cache (with `()` payloads and delivery times as timestamps).

use std::collections::{BTreeMap, HashSet};

use lockstep_sync_types::{EventId, Timestamp};

/// Ordering key of a queued event.
///
/// Field order matters: timestamps compare first, ids break ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// When the event is due.
    pub timestamp: Timestamp,
    /// Deduplication key.
    pub id: EventId,
}

impl EventKey {
    /// Create a key.
    pub fn new(timestamp: Timestamp, id: EventId) -> Self {
        Self { timestamp, id }
    }

    /// The smallest key at `timestamp`, i.e. the boundary below which every
    /// entry is strictly older.
    fn floor(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            id: EventId::min(),
        }
    }
}

/// An event taken out of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent<T> {
    /// When the event is due.
    pub timestamp: Timestamp,
    /// Deduplication key.
    pub id: EventId,
    /// Event payload.
    pub payload: T,
}

impl<T> QueuedEvent<T> {
    /// Create an event.
    pub fn new(timestamp: Timestamp, id: EventId, payload: T) -> Self {
        Self {
            timestamp,
            id,
            payload,
        }
    }

    fn into_parts(self) -> (EventKey, T) {
        (EventKey::new(self.timestamp, self.id), self.payload)
    }
}

/// Deduplicating min-priority queue ordered by `(timestamp, id)`.
///
/// Invariant: no two entries share an id, and `ids` holds exactly the ids
/// present in `entries`.
#[derive(Debug, Clone)]
pub struct TimestampedEventQueue<T> {
    entries: BTreeMap<EventKey, T>,
    ids: HashSet<EventId>,
}

impl<T> TimestampedEventQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ids: HashSet::new(),
        }
    }

    /// Insert an event unless its id is already present.
    ///
    /// Returns whether the event was inserted. A duplicate id is ignored
    /// even when its timestamp or payload differ.
    pub fn add(&mut self, event: QueuedEvent<T>) -> bool {
        if self.ids.contains(&event.id) {
            return false;
        }
        self.ids.insert(event.id.clone());
        let (key, payload) = event.into_parts();
        self.entries.insert(key, payload);
        true
    }

    /// Check whether an event with this id is queued.
    pub fn has(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    /// The earliest event, if any.
    pub fn peek_earliest(&self) -> Option<(&EventKey, &T)> {
        self.entries.first_key_value()
    }

    /// Remove and return the earliest event.
    pub fn remove_earliest(&mut self) -> Option<QueuedEvent<T>> {
        let (key, payload) = self.entries.pop_first()?;
        self.ids.remove(&key.id);
        Some(QueuedEvent::new(key.timestamp, key.id, payload))
    }

    /// Remove a specific event. Returns its payload if it was queued.
    pub fn remove(&mut self, key: &EventKey) -> Option<T> {
        let payload = self.entries.remove(key)?;
        self.ids.remove(&key.id);
        Some(payload)
    }

    /// Remove every event with `timestamp < threshold`.
    ///
    /// Returns how many were removed. Survivors keep their relative order.
    pub fn discard_older_than(&mut self, threshold: Timestamp) -> usize {
        let keep = self.entries.split_off(&EventKey::floor(threshold));
        let stale = std::mem::replace(&mut self.entries, keep);
        for key in stale.keys() {
            self.ids.remove(&key.id);
        }
        stale.len()
    }

    /// Iterate in ascending `(timestamp, id)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &T)> {
        self.entries.iter()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}

impl<T> Default for TimestampedEventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
