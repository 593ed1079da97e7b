//! Consumer-facing callback traits and fast-path tick values.

use serde::Serialize;

use crate::error::Result;
use crate::protocol::Frame;

/// Combined price and size tick (message kind 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSizeTick {
    pub req_id: i64,
    pub tick_type: i32,
    pub price: f64,
    pub size: i64,
}

/// Size-only tick (message kind 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSize {
    pub req_id: i64,
    pub tick_type: i32,
    pub size: i64,
}

/// Order book depth update (message kind 12).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthUpdate {
    pub req_id: i64,
    pub position: i32,
    pub operation: i32,
    pub side: i32,
    pub price: f64,
    pub size: i64,
}

/// String-valued tick (message kind 46).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickString {
    pub req_id: i64,
    pub tick_type: i32,
    pub value: String,
}

/// Receiver of the high-frequency messages that bypass the interpreter.
pub trait Wrapper: Send + 'static {
    fn tick_size(&mut self, tick: TickSize);

    fn tick_string(&mut self, tick: TickString);

    fn update_mkt_depth(&mut self, update: DepthUpdate);

    /// Called once the server version has been negotiated.
    fn connect_ack(&mut self) {}
}

/// Decoder for every message kind this layer does not fast-path.
///
/// Any `FnMut(&Frame) -> Result<()>` closure is an interpreter that ignores
/// the server version.
pub trait Interpreter: Send + 'static {
    /// Decode one frame and invoke the matching domain callback.
    fn interpret(&mut self, frame: &Frame) -> Result<()>;

    /// Record the negotiated server version before any frame is interpreted.
    fn set_server_version(&mut self, _version: i32) {}
}

impl<F> Interpreter for F
where
    F: FnMut(&Frame) -> Result<()> + Send + 'static,
{
    fn interpret(&mut self, frame: &Frame) -> Result<()> {
        self(frame)
    }
}
