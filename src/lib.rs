//! # venue-client
//!
//! Event-driven session client for trading-venue gateway sockets.
//!
//! This crate keeps one TCP connection to a gateway process and handles
//! everything below the application protocol: framing, the version
//! handshake, the readiness barrier, outbound throttling and fast-path
//! dispatch of high-frequency ticks. Every other message is handed to an
//! [`Interpreter`] supplied by the caller.
//!
//! ## Architecture
//!
//! - **Transport**: raw TCP byte pipe
//! - **Protocol**: 4-byte big-endian length prefix, `\0`-terminated fields
//! - **Session**: one tokio task owns all state; [`Client`] handles talk to it
//!   over a channel
//! - **Event loop**: [`EventLoop`] and [`BlockingClient`] for synchronous callers
//!
//! ## Example
//!
//! ```ignore
//! use venue_client::{Client, Frame, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder(MyWrapper, |frame: &Frame| -> Result<()> {
//!             println!("{}", frame);
//!             Ok(())
//!         })
//!         .spawn();
//!
//!     client.connect("127.0.0.1", 4002, 7, None).await?;
//!     println!("next id {}", client.next_request_id().await?);
//!     client.disconnect().await
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod rate_limiter;
pub mod session;
pub mod transport;

mod client;
mod config;
mod runtime;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, DEFAULT_COMMAND_CAPACITY, DEFAULT_CONNECT_TIMEOUT};
pub use error::{ClientError, Result};
pub use handler::{DepthUpdate, Interpreter, PriceSizeTick, TickSize, TickString, Wrapper};
pub use protocol::{ContractDescriptor, Field, Frame, TagValue};
pub use rate_limiter::ThrottleEdge;
pub use runtime::{BlockingClient, EventLoop};
pub use session::{ConnState, ConnectionStats};
