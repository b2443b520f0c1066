//! Protocol messages for Lockstep Sync.
//!
//! The protocol has a single message: the leader's periodic broadcast.
//! Peers never answer it; loss is tolerated by the leader re-sending every
//! event that is still inside its broadcast horizon on each tick.

use serde::{Deserialize, Serialize};

use crate::{EventId, LeaderToken, SyncError, Timestamp};

/// One event as carried on the wire: `[timestamp, id, payload]`.
///
/// The timestamp is on the leader's clock. The id must round-trip
/// byte-exact since peers deduplicate on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent(pub Timestamp, pub EventId, pub Vec<u8>);

impl WireEvent {
    /// Create a wire event.
    pub fn new(timestamp: Timestamp, id: EventId, payload: Vec<u8>) -> Self {
        Self(timestamp, id, payload)
    }

    /// Leader-clock due time.
    pub fn timestamp(&self) -> Timestamp {
        self.0
    }

    /// Deduplication key.
    pub fn id(&self) -> &EventId {
        &self.1
    }

    /// Opaque application payload.
    pub fn payload(&self) -> &[u8] {
        &self.2
    }
}

/// A leader broadcast: one chunk of the leader's pending events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderBroadcast {
    /// Token of the sending leader's current term
    pub leader_epoch_token: LeaderToken,
    /// Leader's monotonic clock when the broadcast was assembled
    pub leader_time: f64,
    /// Events in ascending timestamp order (possibly empty)
    pub events: Vec<WireEvent>,
}

impl LeaderBroadcast {
    /// Whether this broadcast only carries the leader's clock.
    pub fn is_keepalive(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize to MessagePack bytes (field names included).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        rmp_serde::to_vec_named(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        rmp_serde::from_slice(bytes).map_err(SyncError::Deserialization)
    }
}
