//! Error types for the MLLP transport.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by one MLLP send/receive cycle.
///
/// Timeouts and empty responses get their own variants so callers can decide
/// to retry at a higher layer without string-matching IO errors.
#[derive(Debug, Error)]
pub enum SendError {
    /// The TCP connection could not be established.
    #[error("connection to {addr} failed")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing the framed message failed partway.
    #[error("failed to send framed message")]
    Send(#[source] io::Error),

    /// Reading acknowledgement bytes failed.
    #[error("failed to read acknowledgement")]
    Receive(#[source] io::Error),

    /// No complete acknowledgement arrived within the deadline.
    #[error("no acknowledgement within {0:?}")]
    AckTimeout(Duration),

    /// The peer closed the connection without sending a single byte.
    #[error("connection closed without an acknowledgement")]
    EmptyResponse,

    /// The peer kept sending bytes past the configured cap without ever
    /// producing a frame terminator.
    #[error("acknowledgement exceeded {limit} bytes without a terminator")]
    AckTooLarge { limit: usize },
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, SendError>;
