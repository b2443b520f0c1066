//! Leader term state and the broadcast loop.
//!
//! A [`LeaderTerm`] exists from promotion to demotion. It owns the outgoing
//! queue and the sequence counter that names events. The [`BroadcastLoop`]
//! task wakes on a fixed cadence, or as soon as an event is scheduled, and
//! sends everything inside the horizon to the group.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lockstep_sync_core::{
    chunk_events, select_for_broadcast, BroadcastPolicy, QueuedEvent, TimestampedEventQueue,
};
use lockstep_sync_types::{EventId, LeaderBroadcast, LeaderEpoch, Timestamp};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::stats::NodeStats;
use crate::transport::GroupTransport;

/// State of one leadership term.
pub(crate) struct LeaderTerm {
    epoch: LeaderEpoch,
    next_sequence: AtomicU64,
    queue: Mutex<TimestampedEventQueue<Vec<u8>>>,
    wake: Notify,
}

impl LeaderTerm {
    pub(crate) fn new(epoch: LeaderEpoch) -> Self {
        Self {
            epoch,
            next_sequence: AtomicU64::new(0),
            queue: Mutex::new(TimestampedEventQueue::new()),
            wake: Notify::new(),
        }
    }

    pub(crate) fn epoch(&self) -> &LeaderEpoch {
        &self.epoch
    }

    /// Queue an event due at `at` (leader clock) and wake the loop.
    pub(crate) fn schedule(&self, at: f64, payload: Vec<u8>) -> EventId {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let id = EventId::sequenced(&self.epoch.token, sequence);
        self.queue
            .lock()
            .add(QueuedEvent::new(Timestamp::from_secs(at), id.clone(), payload));
        self.wake.notify_one();
        id
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.queue.lock().len()
    }
}

/// Settings the loop reads on every tick.
#[derive(Debug, Clone)]
pub(crate) struct LoopSettings {
    pub interval: Duration,
    pub policy: BroadcastPolicy,
}

/// Handle to a running broadcast loop task.
pub(crate) struct BroadcastLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BroadcastLoop {
    pub(crate) fn spawn<T: GroupTransport>(
        term: Arc<LeaderTerm>,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
        settings: LoopSettings,
        stats: Arc<NodeStats>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(term, transport, clock, settings, stats, shutdown_rx));
        Self { shutdown, handle }
    }

    /// Signal the loop and wait until the task has exited.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Broadcast loop ended abnormally: {}", e);
        }
    }
}

async fn run<T: GroupTransport>(
    term: Arc<LeaderTerm>,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    settings: LoopSettings,
    stats: Arc<NodeStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("Broadcast loop started for epoch {}", term.epoch);

    loop {
        tick(&term, transport.as_ref(), clock.as_ref(), &settings, &stats).await;

        tokio::select! {
            changed = shutdown.changed() => {
                // A dropped handle also ends the loop
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::timeout(settings.interval, term.wake.notified()) => {}
        }
    }

    tracing::debug!("Broadcast loop stopped for epoch {}", term.epoch);
}

async fn tick<T: GroupTransport>(
    term: &LeaderTerm,
    transport: &T,
    clock: &dyn Clock,
    settings: &LoopSettings,
    stats: &NodeStats,
) {
    let now = clock.now();
    let selection = {
        let mut queue = term.queue.lock();
        select_for_broadcast(&mut queue, now, &settings.policy)
    };

    if selection.pruned > 0 {
        tracing::debug!("Dropped {} stale events before sending", selection.pruned);
        stats.record_pruned(selection.pruned);
    }

    for chunk in chunk_events(selection.events, settings.policy.max_events_per_broadcast) {
        let message = LeaderBroadcast {
            leader_epoch_token: term.epoch.token.clone(),
            leader_time: now,
            events: chunk,
        };
        let bytes = match message.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to encode broadcast: {}", e);
                continue;
            }
        };
        match transport.broadcast(&bytes).await {
            Ok(()) => {
                stats.record_broadcast();
                if message.is_keepalive() {
                    tracing::trace!("Sent keepalive at leader time {:.3}", now);
                } else {
                    tracing::debug!(
                        "Broadcast {} events at leader time {:.3}",
                        message.events.len(),
                        now
                    );
                }
            }
            Err(e) => {
                stats.record_send_failure();
                tracing::warn!("Broadcast failed: {}", e);
            }
        }
    }
}
