//! Per-node counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the leader loop, ingest path and delivery stream.
#[derive(Debug, Default)]
pub struct NodeStats {
    broadcasts_sent: AtomicU64,
    send_failures: AtomicU64,
    events_pruned: AtomicU64,
    events_ingested: AtomicU64,
    duplicates_dropped: AtomicU64,
    epoch_changes: AtomicU64,
    events_delivered: AtomicU64,
}

/// Point-in-time copy of [`NodeStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Broadcast messages handed to the transport successfully.
    pub broadcasts_sent: u64,
    /// Broadcasts the transport refused.
    pub send_failures: u64,
    /// Leader events dropped as stale before they could be sent.
    pub events_pruned: u64,
    /// Events newly queued for delivery.
    pub events_ingested: u64,
    /// Received events that were already pending or delivered.
    pub duplicates_dropped: u64,
    /// Leader term changes observed.
    pub epoch_changes: u64,
    /// Events released by the delivery stream.
    pub events_delivered: u64,
}

impl NodeStats {
    pub(crate) fn record_broadcast(&self) {
        self.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pruned(&self, count: usize) {
        self.events_pruned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_ingest(&self, inserted: usize, duplicates: usize, epoch_changed: bool) {
        self.events_ingested
            .fetch_add(inserted as u64, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(duplicates as u64, Ordering::Relaxed);
        if epoch_changed {
            self.epoch_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_delivery(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            broadcasts_sent: self.broadcasts_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            events_pruned: self.events_pruned.load(Ordering::Relaxed),
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            epoch_changes: self.epoch_changes.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
        }
    }
}
