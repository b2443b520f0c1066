//! # sync-core
//!
//! Pure logic for Lockstep Sync (no I/O, instant tests).
//!
//! This crate implements the data structures and algorithms of the protocol
//! without any network access, clocks or threads, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - time comes in as an argument,
//! decisions come out as return values. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about leader/peer state transitions
//!
//! The actual I/O (broadcasting, sleeping until due times) is performed by
//! `sync-client`, which owns the locks and the tasks around these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod offset;
pub mod peer;
pub mod plan;
pub mod queue;

pub use offset::{ClockOffsetEstimator, SMOOTHING};
pub use peer::{IngestOutcome, PeerState};
pub use plan::{chunk_events, select_for_broadcast, BroadcastPolicy, Selection};
pub use queue::{EventKey, QueuedEvent, TimestampedEventQueue};
