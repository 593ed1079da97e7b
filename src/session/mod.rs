//! Session module - connection lifecycle and readiness barrier.
//!
//! - [`ConnState`] - lifecycle states
//! - [`ReadyBarrier`] - next-valid-id and managed-accounts flags
//! - [`ConnectionStats`] - traffic snapshot of a ready session
//!
//! The state machine and the task that drives it are crate-private; use
//! [`Client`](crate::Client) to talk to a session.

mod actor;
mod machine;
mod state;

pub(crate) use actor::{Command, SessionActor};
pub(crate) use machine::StateMachine;
pub use state::{ConnState, ConnectionStats, ReadyBarrier};
