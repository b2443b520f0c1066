//! Error types for Lockstep Sync.

use thiserror::Error;

/// Errors that can occur in Lockstep Sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Scheduling requires the leader role
    #[error("not the group leader")]
    NotLeader,

    /// Transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
