//! # sync-types
//!
//! Wire format types for the Lockstep peer-group event sync protocol.
//!
//! This crate provides the foundational types used across all Lockstep crates:
//! - [`DeviceId`], [`LeaderToken`], [`LeaderEpoch`] - Identity types
//! - [`EventId`], [`Timestamp`] - Event identity and ordering
//! - [`LeaderBroadcast`], [`WireEvent`] - The one message a leader sends
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::SyncError;
pub use ids::{DeviceId, EventId, LeaderEpoch, LeaderToken, Timestamp};
pub use messages::{LeaderBroadcast, WireEvent};
