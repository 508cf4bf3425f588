//! Streaming API
//!
//! Long-lived connections that deliver statuses as newline-delimited JSON.
//!
//! # Design
//!
//! ```text
//!   StreamSupervisor::start(request)
//!        │
//!        ▼  one thread per active stream
//!   ┌──────────────┐  open   ┌──────────────┐  next_event  ┌────────────────┐
//!   │  Connecting  │ ──────▶ │  Streaming   │ ───────────▶ │ StatusListener │
//!   └──────────────┘         └──────────────┘              └────────────────┘
//!        ▲    │ cap reached        │ read failed / EOF
//!        │    ▼                    ▼
//!   ┌──────────────────────────────────┐
//!   │  Retrying (park on Clock)        │
//!   └──────────────────────────────────┘
//! ```
//!
//! - [`StatusStream`] is the pull-style reader over one response body.
//! - [`StreamSupervisor`] owns the reconnect loop. Open failures and dropped
//!   connections draw on the same [`RetryHistory`] budget.
//! - `cleanup` raises a [`ShutdownSignal`] and closes the live connection;
//!   the loop checks the signal at every boundary and exits.

mod clock;
mod connection;
mod listener;
mod request;
mod retry;
mod supervisor;

use thiserror::Error;

pub use clock::{Clock, ManualClock, ShutdownSignal, SystemClock};
pub use connection::{StatusStream, StreamCloser};
pub use listener::StatusListener;
pub use request::StreamRequest;
pub use retry::RetryHistory;
pub use supervisor::{StreamState, StreamSupervisor};

use crate::error::ChirpError;
use crate::model::DecodeError;

/// Failures seen while opening or reading a stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// The read failed or the server hung up; the connection is dead
    #[error("Stream closed: {0}")]
    Closed(String),

    /// The stream was used after it died or was closed
    #[error("Stream already closed")]
    AlreadyClosed,

    /// One line could not be decoded; the connection is still usable
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The connection could not be established
    #[error("Failed to open stream: {0}")]
    Open(#[source] ChirpError),
}

impl StreamError {
    /// Whether the connection that produced this error is gone
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_decode_errors_are_recoverable() {
        assert!(!StreamError::Decode(DecodeError::Malformed("x".into())).is_terminal());
        assert!(StreamError::AlreadyClosed.is_terminal());
        assert!(StreamError::Closed("eof".into()).is_terminal());
        assert!(StreamError::Open(ChirpError::IllegalState("x".into())).is_terminal());
    }
}
