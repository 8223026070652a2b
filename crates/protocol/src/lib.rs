//! Wire types for the Flight Scheduler client.
//!
//! This crate contains the serde-serializable types exchanged with the
//! scheduler's resource API and with the interactive relay. These types
//! represent the "protocol layer": the shapes of data as they appear on
//! the wire, plus the decoded resource records the runtime works with.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and lookup
//! * Closed: Each resource kind is an explicit struct; unknown fields are ignored
//! * Stable: Changes only when the wire protocol changes
//!
//! Streaming and lifecycle behavior lives in `fsched-runtime`.

pub mod document;
pub mod relay;
pub mod types;

pub use document::*;
pub use relay::*;
pub use types::*;
