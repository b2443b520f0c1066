//! Transport abstraction for Lockstep Sync.
//!
//! The peer-group transport (discovery, broadcast, ping measurement, device
//! identity) belongs to the environment. This module defines the narrow
//! surface the protocol needs from it.
//!
//! # Design
//!
//! Sending and receiving are deliberately asymmetric:
//! - the leader loop calls [`GroupTransport::broadcast`] to reach every peer
//! - the transport calls a [`BroadcastReceiver`] (normally a
//!   [`PeerIngest`](crate::PeerIngest)) from its receive path, together with
//!   the [`PeerInfo`] it measured for the sender
//!
//! There is no unicast and no acknowledgement. Delivery may be lossy.
//!
//! # Example
//!
//! ```ignore
//! let group = MemoryGroup::new();
//! group.join(DeviceId::new("a"), 0.0, node_a.ingest());
//! group.endpoint(DeviceId::new("a")).broadcast(&bytes).await?;
//! ```

mod memory;
mod mock;

pub use memory::{MemoryEndpoint, MemoryGroup};
pub use mock::MockTransport;

use async_trait::async_trait;
use lockstep_sync_types::DeviceId;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The group transport has shut down.
    #[error("transport closed")]
    Closed,
}

/// What the transport knows about the sender of a received message.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerInfo {
    /// Sender identity.
    pub device_id: DeviceId,
    /// Ping estimate to the sender, in seconds.
    pub ping: f64,
}

impl PeerInfo {
    /// Create peer info.
    pub fn new(device_id: DeviceId, ping: f64) -> Self {
        Self { device_id, ping }
    }
}

/// Broadcast side of the peer-group transport.
///
/// Implementations send one opaque message to every member of the group.
#[async_trait]
pub trait GroupTransport: Send + Sync + 'static {
    /// Send bytes to all group members.
    ///
    /// A successful return does not mean anyone received the message.
    async fn broadcast(&self, data: &[u8]) -> Result<(), TransportError>;
}

/// Receive side of the peer-group transport.
///
/// Called from the transport's own receive context for every message.
pub trait BroadcastReceiver: Send + Sync + 'static {
    /// Handle one received message.
    fn on_broadcast(&self, peer: &PeerInfo, data: &[u8]);
}
