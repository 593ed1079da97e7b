//! Owned event loop and blocking facade.
//!
//! [`EventLoop`] runs a single-threaded tokio runtime on a dedicated thread.
//! The session task and all its timers live there. [`BlockingClient`] lets
//! synchronous code drive a session: each call submits a future to the loop
//! and parks on a oneshot until it completes.
//!
//! # Example
//!
//! ```ignore
//! use venue_client::Client;
//!
//! let client = Client::builder(MyWrapper, my_interpreter).start_blocking()?;
//! client.connect("127.0.0.1", 4002, 7, None)?;
//! println!("accounts: {:?}", client.account_names()?);
//! client.disconnect()?;
//! ```

use std::future::Future;
use std::thread;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::protocol::Field;
use crate::session::{ConnState, ConnectionStats};

/// Single-threaded tokio runtime on its own thread.
///
/// Stops when dropped. Tasks still running on it are cancelled.
pub struct EventLoop {
    handle: Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl EventLoop {
    /// Build the runtime and start its thread.
    pub fn start() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let (shutdown, stopped) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("venue-event-loop".into())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = stopped.await;
                });
                tracing::debug!("Event loop stopped");
            })?;

        Ok(Self {
            handle,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    /// Handle for spawning onto the loop.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Check if the loop thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Run `future` on the loop and wait for its output.
    ///
    /// Blocks the calling thread without polling. Must not be called from
    /// async code or from the loop thread itself.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });
        rx.blocking_recv().map_err(|_| ClientError::RuntimeStopped)
    }

    /// Stop the loop and join its thread. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Event loop thread panicked");
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Synchronous mirror of [`Client`] backed by its own [`EventLoop`].
pub struct BlockingClient {
    // Dropped before the loop so the session task sees its handles go away.
    client: Client,
    event_loop: EventLoop,
}

impl BlockingClient {
    pub(crate) fn new(client: Client, event_loop: EventLoop) -> Self {
        Self { client, event_loop }
    }

    fn call<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.event_loop.block_on(f(self.client.clone()))?
    }

    /// Connect and block until ready, failed or timed out.
    ///
    /// A timeout is reported as `ClientError::Timeout`.
    pub fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let host = host.to_string();
        self.call(move |client| async move {
            client.connect(&host, port, client_id, timeout).await
        })
    }

    pub fn disconnect(&self) -> Result<()> {
        self.call(|client| async move { client.disconnect().await })
    }

    pub fn is_ready(&self) -> Result<bool> {
        self.call(|client| async move { client.is_ready().await })
    }

    pub fn next_request_id(&self) -> Result<i64> {
        self.call(|client| async move { client.next_request_id().await })
    }

    pub fn account_names(&self) -> Result<Vec<String>> {
        self.call(|client| async move { client.account_names().await })
    }

    pub fn connection_stats(&self) -> Result<ConnectionStats> {
        self.call(|client| async move { client.connection_stats().await })
    }

    pub fn server_version(&self) -> Result<i32> {
        self.call(|client| async move { client.server_version().await })
    }

    pub fn state(&self) -> Result<ConnState> {
        self.call(|client| async move { client.state().await })
    }

    pub fn send(&self, fields: Vec<Field>) -> Result<()> {
        self.call(move |client| async move { client.send(fields).await })
    }

    /// Async handle to the same session.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Disconnect and stop the event loop.
    pub fn shutdown(self) -> Result<()> {
        self.disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_returns_output() {
        let event_loop = EventLoop::start().unwrap();
        assert!(event_loop.is_running());

        let value = event_loop
            .block_on(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                40 + 2
            })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut event_loop = EventLoop::start().unwrap();
        event_loop.stop();
        event_loop.stop();
        assert!(!event_loop.is_running());
    }

    #[test]
    fn test_block_on_after_stop_fails() {
        let mut event_loop = EventLoop::start().unwrap();
        event_loop.stop();

        let result = event_loop.block_on(async { 1 });
        assert!(matches!(result, Err(ClientError::RuntimeStopped)));
    }
}
