//! In-process group transport.
//!
//! Connects any number of nodes inside one process. Each member has a fixed
//! ping: messages reach it after that delay and it is reported as the
//! member's ping to the sender. Messages can be dropped at random to model a
//! lossy network; the sender always receives its own broadcast immediately.

use super::{BroadcastReceiver, GroupTransport, PeerInfo, TransportError};
use async_trait::async_trait;
use lockstep_sync_types::DeviceId;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

/// A simulated peer group.
#[derive(Clone)]
pub struct MemoryGroup {
    inner: Arc<Mutex<GroupInner>>,
}

struct GroupInner {
    members: Vec<Member>,
    loss_rate: f64,
    rng: StdRng,
    delivered: u64,
    dropped: u64,
}

struct Member {
    device_id: DeviceId,
    ping: f64,
    connected: bool,
    receiver: Arc<dyn BroadcastReceiver>,
}

type Delivery = (Arc<dyn BroadcastReceiver>, PeerInfo, f64);

impl MemoryGroup {
    /// Create a lossless group.
    pub fn new() -> Self {
        Self::with_loss(0.0, 0)
    }

    /// Create a group that drops each message to each peer with
    /// probability `loss_rate`, using a seeded generator.
    pub fn with_loss(loss_rate: f64, seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GroupInner {
                members: Vec::new(),
                loss_rate: loss_rate.clamp(0.0, 1.0),
                rng: StdRng::seed_from_u64(seed),
                delivered: 0,
                dropped: 0,
            })),
        }
    }

    /// Add a member that receives broadcasts `ping` seconds after they are
    /// sent. Re-joining replaces the previous registration.
    pub fn join(&self, device_id: DeviceId, ping: f64, receiver: impl BroadcastReceiver) {
        let mut inner = self.inner.lock();
        inner.members.retain(|m| m.device_id != device_id);
        inner.members.push(Member {
            device_id,
            ping: ping.max(0.0),
            connected: true,
            receiver: Arc::new(receiver),
        });
    }

    /// Remove a member.
    pub fn leave(&self, device_id: &DeviceId) {
        self.inner.lock().members.retain(|m| &m.device_id != device_id);
    }

    /// Cut a member off (or reconnect it). A disconnected member neither
    /// sends nor receives.
    pub fn set_connected(&self, device_id: &DeviceId, connected: bool) {
        let mut inner = self.inner.lock();
        if let Some(member) = inner.members.iter_mut().find(|m| &m.device_id == device_id) {
            member.connected = connected;
        }
    }

    /// Change the drop probability.
    pub fn set_loss_rate(&self, loss_rate: f64) {
        self.inner.lock().loss_rate = loss_rate.clamp(0.0, 1.0);
    }

    /// Broadcast handle for `device_id`.
    pub fn endpoint(&self, device_id: DeviceId) -> MemoryEndpoint {
        MemoryEndpoint {
            group: self.clone(),
            sender: device_id,
        }
    }

    /// Number of member deliveries scheduled so far.
    pub fn delivered_count(&self) -> u64 {
        self.inner.lock().delivered
    }

    /// Number of member deliveries dropped so far.
    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().dropped
    }

    fn route(&self, sender: &DeviceId) -> Result<Vec<Delivery>, TransportError> {
        let mut inner = self.inner.lock();
        let sender_connected = inner
            .members
            .iter()
            .any(|m| &m.device_id == sender && m.connected);
        if !sender_connected {
            return Err(TransportError::SendFailed(format!(
                "{} is not connected to the group",
                sender
            )));
        }

        let GroupInner {
            members,
            loss_rate,
            rng,
            delivered,
            dropped,
        } = &mut *inner;

        let mut routes = Vec::with_capacity(members.len());
        for member in members.iter().filter(|m| m.connected) {
            if &member.device_id == sender {
                routes.push((member.receiver.clone(), PeerInfo::new(sender.clone(), 0.0), 0.0));
            } else if *loss_rate > 0.0 && rng.gen::<f64>() < *loss_rate {
                *dropped += 1;
                continue;
            } else {
                routes.push((
                    member.receiver.clone(),
                    PeerInfo::new(sender.clone(), member.ping),
                    member.ping,
                ));
            }
            *delivered += 1;
        }
        Ok(routes)
    }
}

impl Default for MemoryGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// One member's broadcast handle into a [`MemoryGroup`].
#[derive(Clone)]
pub struct MemoryEndpoint {
    group: MemoryGroup,
    sender: DeviceId,
}

impl MemoryEndpoint {
    /// The member this endpoint sends as.
    pub fn device_id(&self) -> &DeviceId {
        &self.sender
    }
}

#[async_trait]
impl GroupTransport for MemoryEndpoint {
    async fn broadcast(&self, data: &[u8]) -> Result<(), TransportError> {
        for (receiver, info, delay) in self.group.route(&self.sender)? {
            if delay <= 0.0 {
                receiver.on_broadcast(&info, data);
                continue;
            }
            let bytes = data.to_vec();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                receiver.on_broadcast(&info, &bytes);
            });
        }
        Ok(())
    }
}
