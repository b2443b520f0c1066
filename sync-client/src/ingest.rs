//! Receive path: leader broadcasts into the local delivery queue.

use std::sync::Arc;

use lockstep_sync_core::{IngestOutcome, PeerState};
use lockstep_sync_types::{LeaderBroadcast, SyncError};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::clock::Clock;
use crate::stats::NodeStats;
use crate::transport::{BroadcastReceiver, PeerInfo};

/// Peer state shared between the receive path and the delivery stream.
#[derive(Default)]
pub(crate) struct PeerShared {
    pub(crate) state: Mutex<PeerState>,
    /// Fired when the earliest pending event may have changed.
    pub(crate) signal: Notify,
}

/// Handle the transport calls for every received broadcast.
///
/// Cheap to clone. Ingesting never blocks on the delivery stream beyond the
/// short peer-state lock.
#[derive(Clone)]
pub struct PeerIngest {
    shared: Arc<PeerShared>,
    clock: Arc<dyn Clock>,
    stats: Arc<NodeStats>,
}

impl PeerIngest {
    pub(crate) fn new(shared: Arc<PeerShared>, clock: Arc<dyn Clock>, stats: Arc<NodeStats>) -> Self {
        Self {
            shared,
            clock,
            stats,
        }
    }

    /// Decode and apply one raw broadcast.
    pub fn on_broadcast(&self, peer: &PeerInfo, data: &[u8]) -> Result<IngestOutcome, SyncError> {
        let broadcast = LeaderBroadcast::from_bytes(data)?;
        Ok(self.ingest(peer, broadcast))
    }

    /// Apply one decoded broadcast from `peer`.
    pub fn ingest(&self, peer: &PeerInfo, broadcast: LeaderBroadcast) -> IngestOutcome {
        let now = self.clock.now();
        let outcome = self
            .shared
            .state
            .lock()
            .ingest(&peer.device_id, peer.ping, now, broadcast);

        if outcome.epoch_changed {
            tracing::info!(
                "Following new leader term from {} (offset {:.3}s)",
                peer.device_id,
                outcome.offset
            );
        }
        if outcome.inserted > 0 {
            tracing::debug!(
                "Queued {} events from {} ({} duplicates)",
                outcome.inserted,
                peer.device_id,
                outcome.duplicates
            );
        }

        self.stats
            .record_ingest(outcome.inserted, outcome.duplicates, outcome.epoch_changed);

        if outcome.inserted > 0 || outcome.epoch_changed {
            self.shared.signal.notify_one();
        }
        outcome
    }
}

impl BroadcastReceiver for PeerIngest {
    fn on_broadcast(&self, peer: &PeerInfo, data: &[u8]) {
        if let Err(e) = PeerIngest::on_broadcast(self, peer, data) {
            tracing::warn!("Ignoring malformed broadcast from {}: {}", peer.device_id, e);
        }
    }
}
