//! Chaos test harness: an in-process group with fault injection.
//!
//! Builds a set of nodes on one [`MemoryGroup`], each with its own ping and
//! clock skew, and records every event each node fires. Scenarios drive
//! leadership, loss and partitions through this type and then check the
//! recorded [`GroupLog`] with the functions in
//! [`assertions`](crate::assertions).

use std::sync::Arc;
use std::time::Duration;

use lockstep_sync_client::{
    ConfigError, GroupConfig, GroupNode, MemoryEndpoint, MemoryGroup, MonotonicClock,
};
use lockstep_sync_types::{DeviceId, EventId, LeaderEpoch, SyncError};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::assertions::{GroupLog, Landing, NodeLog};

/// Errors that can occur during chaos harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Node configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A node refused an operation.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Node index out of range.
    #[error("no node at index {0}")]
    NoSuchNode(usize),
}

/// One member of a chaos group.
#[derive(Debug, Clone)]
pub struct PeerSpec {
    /// Node name
    pub name: String,
    /// Ping from any sender to this node, in seconds
    pub ping: f64,
    /// Clock reading at start, in seconds
    pub skew: f64,
}

impl PeerSpec {
    /// Create a peer spec.
    pub fn new(name: &str, ping: f64, skew: f64) -> Self {
        Self {
            name: name.into(),
            ping,
            skew,
        }
    }
}

/// The standard four-node topology: one local node and three remote ones
/// with increasing ping and unrelated clocks.
pub fn four_peers() -> Vec<PeerSpec> {
    vec![
        PeerSpec::new("alpha", 0.0, 0.0),
        PeerSpec::new("bravo", 0.03, 11.0),
        PeerSpec::new("charlie", 0.05, -4.5),
        PeerSpec::new("delta", 0.08, 250.0),
    ]
}

/// High-level chaos test orchestrator.
pub struct ChaosGroup {
    group: MemoryGroup,
    nodes: Vec<Arc<GroupNode<MemoryEndpoint>>>,
    landings: Arc<Mutex<Vec<Vec<Landing>>>>,
    scheduled: Vec<EventId>,
    consumers: Vec<JoinHandle<()>>,
}

impl ChaosGroup {
    /// Build the group and start every node's delivery consumer.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(peers: &[PeerSpec], loss: f64, seed: u64) -> Result<Self, HarnessError> {
        let group = MemoryGroup::with_loss(loss, seed);
        let landings = Arc::new(Mutex::new(vec![Vec::new(); peers.len()]));
        let mut nodes = Vec::with_capacity(peers.len());
        let mut consumers = Vec::with_capacity(peers.len());

        for (index, spec) in peers.iter().enumerate() {
            let device_id = DeviceId::new(spec.name.as_str());
            let node = Arc::new(GroupNode::new(
                device_id.clone(),
                GroupConfig::default(),
                group.endpoint(device_id.clone()),
                Arc::new(MonotonicClock::with_skew(spec.skew)),
            )?);
            group.join(device_id, spec.ping, node.ingest());

            let mut stream = node
                .take_delivery_stream()
                .ok_or(SyncError::Internal("delivery stream already taken".into()))?;
            let record = landings.clone();
            consumers.push(tokio::spawn(async move {
                loop {
                    let delivery = stream.next().await;
                    record.lock()[index].push(Landing {
                        event: delivery.id().clone(),
                        lateness: delivery.lateness(),
                    });
                }
            }));
            nodes.push(node);
        }

        Ok(Self {
            group,
            nodes,
            landings,
            scheduled: Vec::new(),
            consumers,
        })
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Result<&Arc<GroupNode<MemoryEndpoint>>, HarnessError> {
        self.nodes.get(index).ok_or(HarnessError::NoSuchNode(index))
    }

    /// Promote node `index`.
    pub async fn promote(&self, index: usize) -> Result<LeaderEpoch, HarnessError> {
        Ok(self.node(index)?.promote().await)
    }

    /// Demote node `index`.
    pub async fn demote(&self, index: usize) -> Result<(), HarnessError> {
        self.node(index)?.demote().await;
        Ok(())
    }

    /// Have node `index` schedule an event `delay` seconds from now.
    pub fn schedule_in(&mut self, index: usize, delay: f64) -> Result<EventId, HarnessError> {
        let node = self.node(index)?;
        let id = node.schedule(node.now() + delay, Vec::new())?;
        self.scheduled.push(id.clone());
        Ok(id)
    }

    /// Change the loss probability for every delivery.
    pub fn set_loss(&self, rate: f64) {
        tracing::debug!("Loss rate set to {}", rate);
        self.group.set_loss_rate(rate);
    }

    /// Cut node `index` off from the group.
    pub fn disconnect(&self, index: usize) -> Result<(), HarnessError> {
        let node = self.node(index)?;
        self.group.set_connected(node.device_id(), false);
        Ok(())
    }

    /// Reconnect node `index`.
    pub fn reconnect(&self, index: usize) -> Result<(), HarnessError> {
        let node = self.node(index)?;
        self.group.set_connected(node.device_id(), true);
        Ok(())
    }

    /// Let `secs` seconds pass.
    pub async fn settle(&self, secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    /// Copy of everything recorded so far.
    pub fn log(&self) -> GroupLog {
        let landings = self.landings.lock();
        GroupLog {
            nodes: self
                .nodes
                .iter()
                .zip(landings.iter())
                .map(|(node, landings)| NodeLog {
                    device_id: node.device_id().to_string(),
                    landings: landings.clone(),
                })
                .collect(),
            scheduled: self.scheduled.clone(),
        }
    }

    /// Deliveries the group dropped on purpose.
    pub fn dropped(&self) -> u64 {
        self.group.dropped_count()
    }

    /// Demote every node and stop the consumers.
    pub async fn shutdown(self) {
        for node in &self.nodes {
            node.demote().await;
        }
        for consumer in &self.consumers {
            consumer.abort();
        }
    }
}

impl Drop for ChaosGroup {
    fn drop(&mut self) {
        for consumer in &self.consumers {
            consumer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn harness_records_leader_events() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.3).await;

        let id = chaos.schedule_in(0, 0.4).unwrap();
        chaos.settle(1.0).await;

        let log = chaos.log();
        assert_eq!(log.nodes.len(), 4);
        assert_eq!(log.scheduled, vec![id.clone()]);
        assert!(log.nodes.iter().all(|n| n.ran(&id)));
        chaos.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn bad_requests_are_errors() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        assert!(matches!(chaos.node(9), Err(HarnessError::NoSuchNode(9))));
        assert!(matches!(
            chaos.schedule_in(1, 0.1),
            Err(HarnessError::Sync(SyncError::NotLeader))
        ));
        assert!(chaos.log().scheduled.is_empty());
    }
}
