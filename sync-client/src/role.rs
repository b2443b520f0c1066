//! Leader/peer role transitions.
//!
//! Whether a node leads is decided by the host application. Promotion starts
//! a fresh leader term (new token, empty queue, broadcast loop running);
//! demotion stops the loop and waits for it before returning. Transitions
//! are serialised; scheduling only needs the current term.

use std::sync::Arc;

use lockstep_sync_types::{DeviceId, EventId, LeaderEpoch, LeaderToken, SyncError};
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::clock::Clock;
use crate::leader::{BroadcastLoop, LeaderTerm, LoopSettings};
use crate::stats::NodeStats;
use crate::transport::GroupTransport;

/// Owns the leader term and its broadcast loop.
pub struct RoleController<T: GroupTransport> {
    device_id: DeviceId,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    settings: LoopSettings,
    stats: Arc<NodeStats>,
    term: RwLock<Option<Arc<LeaderTerm>>>,
    broadcast: AsyncMutex<Option<BroadcastLoop>>,
}

impl<T: GroupTransport> RoleController<T> {
    pub(crate) fn new(
        device_id: DeviceId,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
        settings: LoopSettings,
        stats: Arc<NodeStats>,
    ) -> Self {
        Self {
            device_id,
            transport,
            clock,
            settings,
            stats,
            term: RwLock::new(None),
            broadcast: AsyncMutex::new(None),
        }
    }

    /// Become leader. A no-op returning the running epoch if already leading.
    pub async fn promote(&self) -> LeaderEpoch {
        let mut broadcast = self.broadcast.lock().await;
        if let Some(term) = self.term.read().as_ref() {
            return term.epoch().clone();
        }

        let epoch = LeaderEpoch::new(self.device_id.clone(), LeaderToken::random());
        let term = Arc::new(LeaderTerm::new(epoch.clone()));
        *self.term.write() = Some(term.clone());
        *broadcast = Some(BroadcastLoop::spawn(
            term,
            self.transport.clone(),
            self.clock.clone(),
            self.settings.clone(),
            self.stats.clone(),
        ));

        tracing::info!("Promoted to leader, epoch {}", epoch);
        epoch
    }

    /// Stop leading. Returns once the broadcast loop has exited; scheduling
    /// fails with [`SyncError::NotLeader`] from the moment this is called.
    pub async fn demote(&self) {
        let mut broadcast = self.broadcast.lock().await;
        let term = self.term.write().take();
        if let Some(running) = broadcast.take() {
            running.stop().await;
        }
        if let Some(term) = term {
            let unsent = term.pending_len();
            tracing::info!(
                "Demoted from leader, epoch {} ({} events still queued)",
                term.epoch(),
                unsent
            );
        }
    }

    /// Schedule `payload` to fire at `at` on this node's clock.
    pub fn schedule(&self, at: f64, payload: Vec<u8>) -> Result<EventId, SyncError> {
        let term = self.term.read().clone().ok_or(SyncError::NotLeader)?;
        Ok(term.schedule(at, payload))
    }

    /// Same as [`schedule`](Self::schedule).
    pub fn send_event(&self, at: f64, payload: Vec<u8>) -> Result<EventId, SyncError> {
        self.schedule(at, payload)
    }

    /// Whether a leader term is active.
    pub fn is_leader(&self) -> bool {
        self.term.read().is_some()
    }

    /// Epoch of the active leader term.
    pub fn current_epoch(&self) -> Option<LeaderEpoch> {
        self.term.read().as_ref().map(|term| term.epoch().clone())
    }

    /// Events still in the leader queue (not yet pruned).
    pub fn queued_len(&self) -> usize {
        self.term
            .read()
            .as_ref()
            .map_or(0, |term| term.pending_len())
    }
}
