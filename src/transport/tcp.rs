//! TCP byte pipe to the gateway.
//!
//! The transport knows nothing about messages. It delivers whatever chunks
//! the socket yields and reports the end of the connection exactly once.
//!
//! # Example
//!
//! ```ignore
//! use venue_client::transport::{Transport, TransportEvent};
//!
//! let mut transport = Transport::open("127.0.0.1", 4002, 64 * 1024).await?;
//! transport.send(b"API\0").await?;
//!
//! match transport.next_event().await {
//!     TransportEvent::Data(bytes) => println!("{} bytes", bytes.len()),
//!     TransportEvent::Closed => println!("peer closed"),
//!     TransportEvent::Error(msg) => println!("socket error: {}", msg),
//! }
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default read buffer size (64KB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Something the socket reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A chunk of bytes arrived.
    Data(Bytes),
    /// The peer closed the connection cleanly.
    Closed,
    /// The socket failed.
    Error(String),
}

/// Byte-stream connection to the gateway.
pub struct Transport<S = TcpStream> {
    /// Underlying stream, `None` once closed.
    stream: Option<S>,
    /// Reusable read buffer.
    read_buf: BytesMut,
    /// Bytes requested per read.
    read_size: usize,
    /// Set after the terminal event was delivered.
    finished: bool,
}

impl Transport<TcpStream> {
    /// Open a TCP connection to `host:port`.
    ///
    /// Nagle's algorithm is disabled, requests are small and latency bound.
    pub async fn open(host: &str, port: u16, read_size: usize) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self::with_read_size(stream, read_size))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        Self::with_read_size(stream, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap a stream with a custom read size.
    pub fn with_read_size(stream: S, read_size: usize) -> Self {
        let read_size = read_size.max(1);
        Self {
            stream: Some(stream),
            read_buf: BytesMut::with_capacity(read_size),
            read_size,
            finished: false,
        }
    }

    /// Wait for the next socket event.
    ///
    /// After `Closed` or `Error` has been returned once, or after `close()`,
    /// this never resolves. Cancel safe.
    pub async fn next_event(&mut self) -> TransportEvent {
        let stream = match self.stream.as_mut() {
            Some(stream) if !self.finished => stream,
            _ => return std::future::pending().await,
        };

        self.read_buf.reserve(self.read_size);
        match stream.read_buf(&mut self.read_buf).await {
            Ok(0) => {
                self.finished = true;
                TransportEvent::Closed
            }
            Ok(_) => TransportEvent::Data(self.read_buf.split().freeze()),
            Err(e) => {
                self.finished = true;
                TransportEvent::Error(e.to_string())
            }
        }
    }

    /// Write raw bytes, preserving order with earlier sends.
    pub async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))?;
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    /// Shut the connection down. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.finished = true;
    }

    /// Check if the stream is still held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
