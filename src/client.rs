//! Client builder and handle.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the consumer
//! callbacks and limits, then starts the session task. The [`Client`] handle
//! drives the lifecycle:
//! 1. Open the socket and send the handshake preamble
//! 2. Negotiate the server version and send start-API
//! 3. Wait for next-valid-id and managed-accounts
//! 4. Route every further frame to the wrapper or the interpreter
//!
//! # Example
//!
//! ```ignore
//! use venue_client::{Client, Field, Frame};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder(MyWrapper, |frame: &Frame| -> venue_client::Result<()> {
//!             println!("{}", frame);
//!             Ok(())
//!         })
//!         .max_requests(50)
//!         .on_session_start(|| println!("ready"))
//!         .spawn();
//!
//!     client.connect("127.0.0.1", 4002, 7, None).await?;
//!     let id = client.next_request_id().await?;
//!     client.send(vec![Field::from(1), Field::from(11), Field::from(id)]).await?;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::config::ClientConfig;
use crate::dispatch::{PriceSizeHandler, Router};
use crate::error::{ClientError, Result};
use crate::handler::{Interpreter, PriceSizeTick, SessionHooks, Wrapper};
use crate::protocol::Field;
use crate::rate_limiter::ThrottleEdge;
use crate::runtime::{BlockingClient, EventLoop};
use crate::session::{Command, ConnState, ConnectionStats, SessionActor, StateMachine};

/// Builder for configuring and starting a session.
pub struct ClientBuilder {
    config: ClientConfig,
    wrapper: Box<dyn Wrapper>,
    interpreter: Box<dyn Interpreter>,
    price_size_tick: Option<PriceSizeHandler>,
    hooks: SessionHooks,
}

impl ClientBuilder {
    /// Create a builder with the two required consumers.
    pub fn new<W, I>(wrapper: W, interpreter: I) -> Self
    where
        W: Wrapper,
        I: Interpreter,
    {
        Self {
            config: ClientConfig::default(),
            wrapper: Box::new(wrapper),
            interpreter: Box::new(interpreter),
            price_size_tick: None,
            hooks: SessionHooks::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum requests per interval.
    ///
    /// Default: 250
    pub fn max_requests(mut self, max: usize) -> Self {
        self.config.max_requests = max;
        self
    }

    /// Set the rate limiter window.
    ///
    /// Default: 5 seconds
    pub fn request_interval(mut self, interval: Duration) -> Self {
        self.config.request_interval = interval;
        self
    }

    /// Set the client version range offered in the handshake.
    ///
    /// Default: 100..151
    pub fn client_versions(mut self, min: i32, max: i32) -> Self {
        self.config.min_client_version = min;
        self.config.max_client_version = max;
        self
    }

    /// Set the timeout used by `connect(.., None)`.
    ///
    /// Default: 2 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the largest inbound frame body accepted.
    ///
    /// Default: 16MB
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the socket read size.
    ///
    /// Default: 64KB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the command channel capacity.
    ///
    /// Default: 1024
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity;
        self
    }

    /// Set the optional capabilities sent with start-API.
    pub fn optional_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.config.optional_capabilities = capabilities.into();
        self
    }

    /// Fast-path combined price and size ticks to `handler`.
    ///
    /// Without it, price ticks go to the interpreter.
    pub fn on_price_size_tick<F>(mut self, handler: F) -> Self
    where
        F: FnMut(PriceSizeTick) + Send + 'static,
    {
        self.price_size_tick = Some(Box::new(handler));
        self
    }

    /// Called when a network packet arrives, before its frames are handled.
    pub fn on_data_arrived<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.hooks.data_arrived = Some(Box::new(hook));
        self
    }

    /// Called after all frames of a network packet were handled.
    pub fn on_data_processed<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.hooks.data_processed = Some(Box::new(hook));
        self
    }

    pub fn on_session_start<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.hooks.session_start = Some(Box::new(hook));
        self
    }

    pub fn on_session_end<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.hooks.session_end = Some(Box::new(hook));
        self
    }

    pub fn on_session_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.hooks.session_error = Some(Box::new(hook));
        self
    }

    pub fn on_throttle<F>(mut self, hook: F) -> Self
    where
        F: FnMut(ThrottleEdge) + Send + 'static,
    {
        self.hooks.throttle = Some(Box::new(hook));
        self
    }

    fn into_parts(self) -> (Client, SessionActor) {
        let mut router = Router::new(self.wrapper, self.interpreter);
        if let Some(handler) = self.price_size_tick {
            router = router.with_price_size_tick(handler);
        }
        let machine = StateMachine::new(&self.config, router, self.hooks);

        let (tx, rx) = mpsc::channel(self.config.command_capacity.max(1));
        let actor = SessionActor::new(machine, rx, self.config.read_buffer_size);
        let client = Client {
            commands: tx,
            connect_timeout: self.config.connect_timeout,
        };
        (client, actor)
    }

    /// Start the session task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> Client {
        let (client, actor) = self.into_parts();
        tokio::spawn(actor.run());
        client
    }

    /// Start the session task on the given runtime.
    pub fn spawn_on(self, handle: &Handle) -> Client {
        let (client, actor) = self.into_parts();
        handle.spawn(actor.run());
        client
    }

    /// Start a dedicated event loop and return a blocking client.
    ///
    /// Must not be called from async code.
    pub fn start_blocking(self) -> Result<BlockingClient> {
        let event_loop = EventLoop::start()?;
        let client = self.spawn_on(event_loop.handle());
        Ok(BlockingClient::new(client, event_loop))
    }
}

/// Handle to a running session.
///
/// Cheaply cloneable. The session task stops once every handle is dropped.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::Sender<Command>,
    connect_timeout: Duration,
}

impl Client {
    /// Create a new client builder.
    pub fn builder<W, I>(wrapper: W, interpreter: I) -> ClientBuilder
    where
        W: Wrapper,
        I: Interpreter,
    {
        ClientBuilder::new(wrapper, interpreter)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ClientError::RuntimeStopped)?;
        rx.await.map_err(|_| ClientError::RuntimeStopped)
    }

    /// Connect and wait until the session is ready.
    ///
    /// `None` uses the configured connect timeout; a zero timeout waits
    /// forever. On timeout the session is reset and `ClientError::Timeout`
    /// is returned.
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(self.connect_timeout);
        self.request(|reply| Command::Connect {
            host: host.to_string(),
            port,
            client_id,
            timeout,
            reply,
        })
        .await?
    }

    /// Close the connection and reset the session.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(Command::Disconnect).await
    }

    pub async fn is_ready(&self) -> Result<bool> {
        self.request(Command::IsReady).await
    }

    /// Get the next request id and advance the counter.
    pub async fn next_request_id(&self) -> Result<i64> {
        self.request(Command::NextRequestId).await?
    }

    pub async fn account_names(&self) -> Result<Vec<String>> {
        self.request(Command::AccountNames).await?
    }

    pub async fn connection_stats(&self) -> Result<ConnectionStats> {
        self.request(Command::ConnectionStats).await?
    }

    /// Negotiated server version.
    pub async fn server_version(&self) -> Result<i32> {
        self.request(Command::ServerVersion).await?
    }

    pub async fn state(&self) -> Result<ConnState> {
        self.request(Command::State).await
    }

    /// Encode `fields` as one request and pass it through the rate limiter.
    ///
    /// Returns once the frame is written or queued.
    pub async fn send(&self, fields: Vec<Field>) -> Result<()> {
        self.request(|reply| Command::Send { fields, reply }).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{DepthUpdate, TickSize, TickString};
    use crate::protocol::Frame;

    struct Quiet;

    impl Wrapper for Quiet {
        fn tick_size(&mut self, _tick: TickSize) {}
        fn tick_string(&mut self, _tick: TickString) {}
        fn update_mkt_depth(&mut self, _update: DepthUpdate) {}
    }

    fn builder() -> ClientBuilder {
        Client::builder(Quiet, |_: &Frame| -> Result<()> { Ok(()) })
    }

    #[test]
    fn test_builder_configuration() {
        let builder = builder()
            .max_requests(50)
            .request_interval(Duration::from_secs(1))
            .client_versions(100, 140)
            .connect_timeout(Duration::from_secs(10))
            .max_frame_size(1024)
            .read_buffer_size(4096)
            .command_capacity(16)
            .optional_capabilities("+PACEAPI");

        assert_eq!(builder.config.max_requests, 50);
        assert_eq!(builder.config.request_interval, Duration::from_secs(1));
        assert_eq!(builder.config.max_client_version, 140);
        assert_eq!(builder.config.connect_timeout, Duration::from_secs(10));
        assert_eq!(builder.config.max_frame_size, 1024);
        assert_eq!(builder.config.read_buffer_size, 4096);
        assert_eq!(builder.config.command_capacity, 16);
        assert_eq!(builder.config.optional_capabilities, "+PACEAPI");
    }

    #[test]
    fn test_builder_hooks() {
        let builder = builder()
            .on_price_size_tick(|_| {})
            .on_data_arrived(|| {})
            .on_session_error(|_| {})
            .on_throttle(|_| {});

        assert!(builder.price_size_tick.is_some());
        assert!(builder.hooks.data_arrived.is_some());
        assert!(builder.hooks.session_error.is_some());
        assert!(builder.hooks.throttle.is_some());
        assert!(builder.hooks.session_start.is_none());
    }

    #[tokio::test]
    async fn test_accessors_before_connect() {
        let client = builder().spawn();

        assert!(!client.is_ready().await.unwrap());
        assert_eq!(client.state().await.unwrap(), ConnState::Disconnected);
        assert!(matches!(
            client.next_request_id().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.account_names().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.connection_stats().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.server_version().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.send(vec![Field::from(1)]).await,
            Err(ClientError::NotConnected)
        ));
        client.disconnect().await.unwrap();
    }
}
