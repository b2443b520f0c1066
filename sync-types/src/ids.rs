//! Identity and ordering types for Lockstep Sync.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of a device in the peer group.
///
/// Supplied by the group transport alongside every received message;
/// this crate never mints device identities itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a DeviceId from the transport's identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

/// A random token minted every time a node is promoted to leader.
///
/// 16 bytes of random data, carried on the wire as URL-safe base64.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaderToken(String);

impl LeaderToken {
    /// Mint a new random token.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token received from the wire.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for LeaderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "LeaderToken({})", short)
    }
}

/// One leadership term: which device leads, and under which token.
///
/// Changes whenever leadership moves, even back to the same device,
/// because promotion always mints a fresh [`LeaderToken`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaderEpoch {
    /// The leading device.
    pub device_id: DeviceId,
    /// Token minted at promotion.
    pub token: LeaderToken,
}

impl LeaderEpoch {
    /// Create an epoch from its parts.
    pub fn new(device_id: DeviceId, token: LeaderToken) -> Self {
        Self { device_id, token }
    }
}

impl fmt::Display for LeaderEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.token)
    }
}

/// Unique identifier of a scheduled event.
///
/// The sole deduplication key: two events with the same id are the same
/// event regardless of payload. Leaders assign `"{token}.{sequence}"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wrap an id received from the wire.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the id of the `sequence`-th event of a leader term.
    pub fn sequenced(token: &LeaderToken, sequence: u64) -> Self {
        Self(format!("{}.{}", token, sequence))
    }

    /// The smallest possible id in the total order.
    pub fn min() -> Self {
        Self(String::new())
    }

    /// Get the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

/// A point on a monotonic clock, in seconds.
///
/// Totally ordered (via [`f64::total_cmp`]) so it can key ordered
/// collections. Whether it refers to the leader's clock or a peer's local
/// clock depends on where it is used.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// Create a timestamp from seconds.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Seconds value.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// This timestamp shifted by `secs` (negative moves earlier).
    pub fn shifted(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}
