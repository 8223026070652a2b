//! Interactive streaming core for the Flight Scheduler client.
//!
//! * [`sync`]: long-poll a scheduler resource until a predicate holds
//! * [`connection`]: one raw TCP bridge to an execution's stepd endpoint
//! * [`session`]: fan local input out to every execution of a job step
//! * [`bridge`]: message-framed attach through the interactive relay
//!
//! Every component takes a [`BridgeConfig`] explicitly; nothing in this crate
//! reads global state.

pub mod bridge;
pub mod config;
pub mod connection;
pub mod error;
pub mod process;
pub mod session;
pub mod sync;
pub mod terminal;

pub use bridge::{AttachRequest, InteractiveBridge};
pub use config::BridgeConfig;
pub use connection::{ConnectionState, InputHandle, OutputSink, StepConnection};
pub use error::{Error, Result, is_expected_stream_end};
pub use session::{InputMode, LocalInput, SessionHandle, SessionOrchestrator};
pub use sync::ResourceSync;
