//! # sync-client
//!
//! Runtime for the Lockstep peer-group event sync protocol.
//!
//! A leader schedules timestamped events and re-broadcasts them to the whole
//! group on a fixed cadence; every node (the leader included) rebuilds a
//! deduplicated, time-ordered delivery stream on its own clock. [`GroupRpc`]
//! turns delivered events into named calls so that all devices run the same
//! function at the same instant.
//!
//! ## Features
//!
//! - **Clock Skew Compensation**: smoothed per-leader offset estimate
//! - **Loss Tolerance**: horizon-bounded retransmission, no acknowledgements
//! - **At-Most-Once Delivery**: id deduplication plus a handled-id cache
//! - **Transport Abstraction**: pluggable broadcast layer (memory, mock)
//! - **Pure Core**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use lockstep_sync_client::{GroupConfig, GroupNode, MemoryGroup, MonotonicClock};
//!
//! let group = MemoryGroup::new();
//! let node = GroupNode::new(device_id.clone(), GroupConfig::default(), group.endpoint(device_id.clone()), clock)?;
//! group.join(device_id.clone(), 0.0, node.ingest());
//!
//! node.promote().await;
//! node.schedule(node.now() + 0.5, b"fade".to_vec())?;
//!
//! let mut stream = node.take_delivery_stream().expect("first reader");
//! let delivery = stream.next().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod delivery;
pub mod ingest;
mod leader;
pub mod node;
pub mod role;
pub mod rpc;
pub mod stats;
pub mod transport;

pub use clock::{Clock, MonotonicClock};
pub use config::{ConfigError, GroupConfig};
pub use delivery::{Delivery, DeliveryStream};
pub use ingest::PeerIngest;
pub use node::GroupNode;
pub use role::RoleController;
pub use rpc::{CallTable, GroupRpc, RpcCall, RpcError};
pub use stats::{NodeStats, StatsSnapshot};
pub use transport::{
    BroadcastReceiver, GroupTransport, MemoryEndpoint, MemoryGroup, MockTransport, PeerInfo,
    TransportError,
};
