//! A group member: leader role, receive path and delivery stream together.

use std::sync::Arc;

use lockstep_sync_core::IngestOutcome;
use lockstep_sync_types::{DeviceId, EventId, LeaderEpoch, SyncError};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::{ConfigError, GroupConfig};
use crate::delivery::DeliveryStream;
use crate::ingest::{PeerIngest, PeerShared};
use crate::leader::LoopSettings;
use crate::role::RoleController;
use crate::stats::{NodeStats, StatsSnapshot};
use crate::transport::{GroupTransport, PeerInfo};

/// One device in a sync group.
///
/// Every node, leader or not, receives broadcasts through [`ingest`] and
/// consumes them through its delivery stream. The leader also receives its
/// own broadcasts, so it fires events on exactly the same path as everyone
/// else.
///
/// [`ingest`]: GroupNode::ingest
pub struct GroupNode<T: GroupTransport> {
    device_id: DeviceId,
    config: GroupConfig,
    clock: Arc<dyn Clock>,
    stats: Arc<NodeStats>,
    role: RoleController<T>,
    peer: Arc<PeerShared>,
    stream: Mutex<Option<DeliveryStream>>,
}

impl<T: GroupTransport> GroupNode<T> {
    /// Create a node. Nothing runs until [`promote`](Self::promote) or the
    /// transport starts feeding [`ingest`](Self::ingest).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration does not validate.
    pub fn new(
        device_id: DeviceId,
        config: GroupConfig,
        transport: T,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let stats = Arc::new(NodeStats::default());
        let peer = Arc::new(PeerShared::default());
        let role = RoleController::new(
            device_id.clone(),
            Arc::new(transport),
            clock.clone(),
            LoopSettings {
                interval: config.broadcast_interval(),
                policy: config.broadcast_policy(),
            },
            stats.clone(),
        );
        let stream = DeliveryStream::new(
            peer.clone(),
            clock.clone(),
            config.idle_wait(),
            config.handled_retention_secs,
            stats.clone(),
        );

        tracing::debug!("Created group node {}", device_id);

        Ok(Self {
            device_id,
            config,
            clock,
            stats,
            role,
            peer,
            stream: Mutex::new(Some(stream)),
        })
    }

    /// This node's identity.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Effective configuration.
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Current time on this node's clock, in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Start leading. See [`RoleController::promote`].
    pub async fn promote(&self) -> LeaderEpoch {
        self.role.promote().await
    }

    /// Stop leading and wait for the broadcast loop to exit.
    pub async fn demote(&self) {
        self.role.demote().await
    }

    /// Whether this node currently leads.
    pub fn is_leader(&self) -> bool {
        self.role.is_leader()
    }

    /// Epoch of this node's own leader term, if leading.
    pub fn current_epoch(&self) -> Option<LeaderEpoch> {
        self.role.current_epoch()
    }

    /// Schedule an event at `at` on this node's clock.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotLeader`] unless promoted.
    pub fn schedule(&self, at: f64, payload: Vec<u8>) -> Result<EventId, SyncError> {
        self.role.schedule(at, payload)
    }

    /// Same as [`schedule`](Self::schedule).
    pub fn send_event(&self, at: f64, payload: Vec<u8>) -> Result<EventId, SyncError> {
        self.role.send_event(at, payload)
    }

    /// Role controller, for callers that manage leadership separately.
    pub fn role(&self) -> &RoleController<T> {
        &self.role
    }

    /// Receive handle to register with the transport.
    pub fn ingest(&self) -> PeerIngest {
        PeerIngest::new(self.peer.clone(), self.clock.clone(), self.stats.clone())
    }

    /// Decode and apply one raw broadcast.
    pub fn on_broadcast(&self, peer: &PeerInfo, data: &[u8]) -> Result<IngestOutcome, SyncError> {
        self.ingest().on_broadcast(peer, data)
    }

    /// Take the delivery stream. Only the first call gets it.
    pub fn take_delivery_stream(&self) -> Option<DeliveryStream> {
        self.stream.lock().take()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Events received but not yet delivered.
    pub fn pending_count(&self) -> usize {
        self.peer.state.lock().pending_len()
    }

    /// Smoothed offset to the leader being followed.
    pub fn smoothed_offset(&self) -> Option<f64> {
        self.peer.state.lock().smoothed_offset()
    }

    /// Leader term this node is following.
    pub fn observed_epoch(&self) -> Option<LeaderEpoch> {
        self.peer.state.lock().last_epoch().cloned()
    }
}
