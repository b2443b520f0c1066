//! Mock transport for testing.
//!
//! Captures broadcast messages for verification and can be told to fail.

use super::{GroupTransport, TransportError};
use async_trait::async_trait;
use lockstep_sync_types::{LeaderBroadcast, SyncError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the node owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent_messages: Vec<Vec<u8>>,
    fail_next_broadcast: Option<String>,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all messages that were broadcast.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        self.inner.lock().sent_messages.clone()
    }

    /// Get the last message that was broadcast.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.inner.lock().sent_messages.last().cloned()
    }

    /// Decode every captured message as a leader broadcast.
    pub fn sent_broadcasts(&self) -> Result<Vec<LeaderBroadcast>, SyncError> {
        self.inner
            .lock()
            .sent_messages
            .iter()
            .map(|bytes| LeaderBroadcast::from_bytes(bytes))
            .collect()
    }

    /// Cause the next broadcast() to fail with the given error.
    pub fn fail_next_broadcast(&self, error: &str) {
        self.inner.lock().fail_next_broadcast = Some(error.to_string());
    }

    /// Make every further broadcast() fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Clear all state (messages, failures).
    pub fn reset(&self) {
        *self.inner.lock() = MockTransportInner::default();
    }
}

#[async_trait]
impl GroupTransport for MockTransport {
    async fn broadcast(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(TransportError::Closed);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_broadcast.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(data.to_vec());
        Ok(())
    }
}
