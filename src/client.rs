//! The MLLP send/receive cycle: one connection, one framed message, one
//! deadline-bounded wait for the acknowledgement.

use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tokio_util::codec::Encoder;

use crate::codec::{self, MllpCodec};
use crate::error::{Result, SendError};

/// How long to wait for an acknowledgement unless overridden.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Acknowledgement size cap unless overridden. Generous for any ACK/NAK.
pub const DEFAULT_MAX_ACK_BYTES: usize = 64 * 1024;

/// Bytes reserved ahead of each read.
const READ_CHUNK: usize = 4096;

/// An acknowledgement returned by the remote listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// The unframed acknowledgement, decoded leniently: invalid byte
    /// sequences become replacement characters rather than errors.
    pub message: String,
    /// False when the peer closed the connection before the frame terminator
    /// arrived; `message` then holds whatever was received.
    pub complete: bool,
}

/// A client for publishing messages over MLLP.
///
/// Each [`send`](MllpClient::send) opens its own TCP connection, writes one
/// framed message and waits for the acknowledgement frame. The connection is
/// owned by the call and dropped before it returns, on every path, so
/// concurrent sends through one client never share a socket.
#[derive(Debug, Clone)]
pub struct MllpClient {
    addr: String,
    ack_timeout: Duration,
    max_ack_bytes: usize,
}

impl MllpClient {
    /// Creates a client for the listener at `addr` (a `host:port` pair).
    pub fn new(addr: impl Into<String>) -> Self {
        MllpClient {
            addr: addr.into(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_ack_bytes: DEFAULT_MAX_ACK_BYTES,
        }
    }

    /// Sets the acknowledgement deadline for each send.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Caps how many acknowledgement bytes are buffered before the exchange
    /// is abandoned.
    pub fn with_max_ack_bytes(mut self, limit: usize) -> Self {
        self.max_ack_bytes = limit;
        self
    }

    /// The listener address this client publishes to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends `payload` wrapped in MLLP framing and waits for the response.
    ///
    /// Connection failures surface immediately; there is no retry here.
    pub async fn send(&self, payload: &[u8]) -> Result<Ack> {
        debug!("MLLP: connecting to {}", self.addr);
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| SendError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        self.exchange(stream, payload).await
    }

    /// Drives one MLLP exchange over an already-connected stream.
    ///
    /// The stream is consumed and dropped when the exchange ends, whatever
    /// the outcome. Exposed separately so non-TCP transports and tests can
    /// supply their own stream.
    pub async fn exchange<S>(&self, mut stream: S, payload: &[u8]) -> Result<Ack>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut frame = BytesMut::with_capacity(payload.len() + 3);
        MllpCodec::new()
            .encode(BytesMut::from(payload), &mut frame)
            .map_err(SendError::Send)?;

        stream.write_all(&frame).await.map_err(SendError::Send)?;
        stream.flush().await.map_err(SendError::Send)?;
        trace!("MLLP: {} framed bytes sent, awaiting ack", frame.len());

        // One overall deadline for the whole wait, not a per-read timeout
        // that a slowly dribbling peer could keep resetting.
        let deadline = Instant::now() + self.ack_timeout;
        let mut ack = BytesMut::with_capacity(READ_CHUNK);

        let complete = loop {
            if ack.len() >= self.max_ack_bytes {
                warn!(
                    "MLLP: abandoning response, {} bytes with no terminator",
                    ack.len()
                );
                return Err(SendError::AckTooLarge {
                    limit: self.max_ack_bytes,
                });
            }

            ack.reserve(READ_CHUNK);
            let read = match timeout_at(deadline, stream.read_buf(&mut ack)).await {
                Ok(result) => result.map_err(SendError::Receive)?,
                Err(_) => return Err(SendError::AckTimeout(self.ack_timeout)),
            };

            if read == 0 {
                break false; //peer closed; whatever arrived is the response
            }
            if codec::footer_position(&ack).is_some() {
                break true;
            }
        };

        if ack.is_empty() {
            return Err(SendError::EmptyResponse);
        }

        debug!(
            "MLLP: ack received ({} bytes, complete frame: {})",
            ack.len(),
            complete
        );
        let message = String::from_utf8_lossy(codec::strip_frame(&ack)).into_owned();
        Ok(Ack { message, complete })
    }
}
