//! Handler module - consumer callbacks.
//!
//! Provides:
//! - [`Wrapper`] - receives fast-pathed ticks and the connect acknowledgment
//! - [`Interpreter`] - decodes every other message kind
//! - [`SessionHooks`] - optional lifecycle and packet notifications
//!
//! # Example
//!
//! ```ignore
//! use venue_client::handler::{DepthUpdate, TickSize, TickString, Wrapper};
//!
//! struct Printer;
//!
//! impl Wrapper for Printer {
//!     fn tick_size(&mut self, tick: TickSize) {
//!         println!("size {} for {}", tick.size, tick.req_id);
//!     }
//!     fn tick_string(&mut self, tick: TickString) {
//!         println!("{} = {}", tick.tick_type, tick.value);
//!     }
//!     fn update_mkt_depth(&mut self, update: DepthUpdate) {
//!         println!("depth {:?}", update);
//!     }
//! }
//! ```

mod hooks;
mod wrapper;

pub use hooks::{ErrorHook, Hook, SessionHooks, ThrottleHook};
pub use wrapper::{DepthUpdate, Interpreter, PriceSizeTick, TickSize, TickString, Wrapper};
