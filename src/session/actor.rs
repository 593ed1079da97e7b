//! Session task.
//!
//! One tokio task owns the [`StateMachine`], the socket and both timers.
//! Callers reach it through [`Command`]s on an mpsc channel and get answers
//! on oneshot channels, so session state is never shared.
//!
//! ```text
//! Client ─┐
//! Client ─┼─► mpsc::Sender<Command> ─► SessionActor ─► Transport ─► gateway
//! Client ─┘            ▲                    │
//!                      └── oneshot replies ─┘
//! ```

use std::future::{pending, Future};
use std::io;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use super::machine::StateMachine;
use super::state::{ConnState, ConnectionStats};
use crate::error::{ClientError, Result};
use crate::protocol::Field;
use crate::transport::{Transport, TransportEvent};

/// Request from a client handle to the session task.
pub(crate) enum Command {
    Connect {
        host: String,
        port: u16,
        client_id: i32,
        timeout: Duration,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect(oneshot::Sender<()>),
    Send {
        fields: Vec<Field>,
        reply: oneshot::Sender<Result<()>>,
    },
    IsReady(oneshot::Sender<bool>),
    NextRequestId(oneshot::Sender<Result<i64>>),
    AccountNames(oneshot::Sender<Result<Vec<String>>>),
    ConnectionStats(oneshot::Sender<Result<ConnectionStats>>),
    ServerVersion(oneshot::Sender<Result<i32>>),
    State(oneshot::Sender<ConnState>),
}

type Opening = Pin<Box<dyn Future<Output = io::Result<Transport>> + Send>>;

/// A connect call waiting for the ready state.
struct PendingConnect {
    reply: oneshot::Sender<Result<()>>,
    timeout: Duration,
    /// `None` when the caller asked for no deadline.
    deadline: Option<Instant>,
}

/// Owner of the session state and the socket.
pub(crate) struct SessionActor {
    machine: StateMachine,
    commands: mpsc::Receiver<Command>,
    opening: Option<Opening>,
    transport: Option<Transport>,
    pending: Option<PendingConnect>,
    read_buffer_size: usize,
}

impl SessionActor {
    pub fn new(
        machine: StateMachine,
        commands: mpsc::Receiver<Command>,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            machine,
            commands,
            opening: None,
            transport: None,
            pending: None,
            read_buffer_size,
        }
    }

    /// Run until every client handle is dropped.
    pub async fn run(mut self) {
        loop {
            let flush_at = self.machine.flush_at();
            let deadline = self.pending.as_ref().and_then(|p| p.deadline);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                opened = poll_opening(&mut self.opening) => {
                    self.opening = None;
                    self.on_opened(opened).await;
                }
                event = next_event(&mut self.transport) => self.on_event(event).await,
                _ = sleep_at(flush_at) => {
                    self.machine.flush(Instant::now());
                    let _ = self.write_outbox().await;
                }
                _ = sleep_at(deadline) => self.on_deadline().await,
            }
        }

        tracing::debug!("All client handles dropped, stopping session task");
        self.machine.disconnect();
        self.close_socket().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect {
                host,
                port,
                client_id,
                timeout,
                reply,
            } => self.connect(host, port, client_id, timeout, reply),
            Command::Disconnect(reply) => {
                self.machine.disconnect();
                self.abort(ClientError::ConnectionClosed("disconnected".into()))
                    .await;
                let _ = reply.send(());
            }
            Command::Send { fields, reply } => {
                let result = match self.machine.send_fields(Instant::now(), &fields) {
                    Ok(()) => self.write_outbox().await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::IsReady(reply) => {
                let _ = reply.send(self.machine.is_ready());
            }
            Command::NextRequestId(reply) => {
                let _ = reply.send(self.machine.next_request_id());
            }
            Command::AccountNames(reply) => {
                let _ = reply.send(self.machine.account_names());
            }
            Command::ConnectionStats(reply) => {
                let _ = reply.send(self.machine.connection_stats());
            }
            Command::ServerVersion(reply) => {
                let _ = reply.send(self.machine.server_version());
            }
            Command::State(reply) => {
                let _ = reply.send(self.machine.state());
            }
        }
    }

    fn connect(
        &mut self,
        host: String,
        port: u16,
        client_id: i32,
        timeout: Duration,
        reply: oneshot::Sender<Result<()>>,
    ) {
        if self.pending.is_some() {
            let _ = reply.send(Err(ClientError::AlreadyConnected));
            return;
        }
        if let Err(e) = self.machine.begin_connect(client_id) {
            let _ = reply.send(Err(e));
            return;
        }

        tracing::info!("Connecting to {}:{} with client id {}", host, port, client_id);
        let read_size = self.read_buffer_size;
        self.opening = Some(Box::pin(async move {
            Transport::open(&host, port, read_size).await
        }));
        self.pending = Some(PendingConnect {
            reply,
            timeout,
            deadline: (!timeout.is_zero()).then(|| Instant::now() + timeout),
        });
    }

    async fn on_opened(&mut self, opened: io::Result<Transport>) {
        match opened {
            Ok(transport) => {
                self.transport = Some(transport);
                self.machine.on_socket_connected();
                let _ = self.write_outbox().await;
            }
            Err(e) => {
                let err = self.machine.on_connect_failed(e);
                self.abort(err).await;
            }
        }
    }

    async fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Data(bytes) => match self.machine.on_data(Instant::now(), &bytes) {
                Ok(became_ready) => {
                    let _ = self.write_outbox().await;
                    if became_ready {
                        if let Some(pending) = self.pending.take() {
                            let _ = pending.reply.send(Ok(()));
                        }
                    }
                }
                Err(e) => {
                    let err = self.machine.on_error(e);
                    self.abort(err).await;
                }
            },
            TransportEvent::Closed => {
                let err = self.machine.on_peer_closed();
                self.abort(err).await;
            }
            TransportEvent::Error(description) => {
                let err = self.machine.on_socket_error(&description);
                self.abort(err).await;
            }
        }
    }

    async fn on_deadline(&mut self) {
        let timeout = match self.pending.as_ref() {
            Some(pending) => pending.timeout,
            None => return,
        };
        let err = self.machine.on_connect_timeout(timeout);
        self.abort(err).await;
    }

    /// Hand everything in the outbox to the socket.
    ///
    /// A failed write tears the session down; the returned error tells a
    /// sender its frame never left.
    async fn write_outbox(&mut self) -> Result<()> {
        let frames = self.machine.take_outbox();
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };

        for frame in frames {
            if let Err(e) = transport.send(&frame).await {
                let reason = format!("write failed: {}", e);
                let err = self.machine.on_socket_error(&e.to_string());
                self.abort(err).await;
                return Err(ClientError::ConnectionClosed(reason));
            }
            self.machine.record_sent(frame.len());
        }
        Ok(())
    }

    /// Drop the socket and fail a pending connect with `err`.
    async fn abort(&mut self, err: ClientError) {
        self.close_socket().await;
        if let Some(pending) = self.pending.take() {
            let _ = pending.reply.send(Err(err));
        }
    }

    async fn close_socket(&mut self) {
        self.opening = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }
}

async fn poll_opening(opening: &mut Option<Opening>) -> io::Result<Transport> {
    match opening.as_mut() {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_event(transport: &mut Option<Transport>) -> TransportEvent {
    match transport.as_mut() {
        Some(transport) => transport.next_event().await,
        None => pending().await,
    }
}

async fn sleep_at(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}
