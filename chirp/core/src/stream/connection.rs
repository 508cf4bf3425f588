//! One open status stream
//!
//! [`StatusStream`] reads newline-delimited JSON from a long-lived response
//! body. Blank lines are keep-alives and are skipped. Lines of an unknown
//! shape are skipped as well; malformed lines are reported but leave the
//! connection usable. A read failure or end of body kills the stream for good.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::StreamError;
use crate::http::{Disconnect, HttpResponse};
use crate::model::{DecodeError, Decoder, Status, StreamEvent};

struct CloseState {
    closed: AtomicBool,
    disconnect: Option<Arc<dyn Disconnect>>,
}

impl CloseState {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Some(handle) = &self.disconnect {
                handle.disconnect();
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Closes a [`StatusStream`] from another thread
///
/// Closing twice is harmless. A reader blocked in a read returns once the
/// transport honours the disconnect; without a disconnect handle it returns
/// with the next line or read timeout.
#[derive(Clone)]
pub struct StreamCloser(Arc<CloseState>);

impl StreamCloser {
    /// Mark the stream closed and disconnect the underlying response
    pub fn close(&self) {
        self.0.close();
    }

    /// Whether the stream has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl fmt::Debug for StreamCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCloser")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Pull-style reader over one streaming response
pub struct StatusStream {
    reader: BufReader<Box<dyn Read + Send>>,
    decoder: Arc<dyn Decoder>,
    state: Arc<CloseState>,
    alive: bool,
    line: Vec<u8>,
}

impl StatusStream {
    /// Wrap an established response body
    pub fn new(
        body: Box<dyn Read + Send>,
        disconnect: Option<Arc<dyn Disconnect>>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        Self {
            reader: BufReader::new(body),
            decoder,
            state: Arc::new(CloseState {
                closed: AtomicBool::new(false),
                disconnect,
            }),
            alive: true,
            line: Vec::new(),
        }
    }

    /// Wrap a successful streaming response
    pub fn from_response(response: HttpResponse, decoder: Arc<dyn Decoder>) -> Self {
        let (body, disconnect) = response.into_body();
        Self::new(body, disconnect, decoder)
    }

    /// Handle that closes this stream from any thread
    #[must_use]
    pub fn closer(&self) -> StreamCloser {
        StreamCloser(Arc::clone(&self.state))
    }

    /// Whether further reads may return records
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive && !self.state.is_closed()
    }

    /// Next status, skipping deletion and track-limit notices
    ///
    /// # Errors
    ///
    /// Same as [`StatusStream::next_event`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Status, StreamError> {
        loop {
            match self.next_event()? {
                StreamEvent::Status(status) => return Ok(*status),
                StreamEvent::Deletion(notice) => {
                    tracing::debug!(status_id = notice.status_id, "Skipping deletion notice");
                }
                StreamEvent::TrackLimitation(withheld) => {
                    tracing::debug!(withheld, "Skipping track limitation notice");
                }
            }
        }
    }

    /// Next record of any kind
    ///
    /// Blocks until a complete line arrives.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Decode`] for a malformed line; the stream stays usable.
    /// - [`StreamError::Closed`] when the read fails or the body ends; the
    ///   stream is dead afterwards.
    /// - [`StreamError::AlreadyClosed`] on any call after the stream died or
    ///   was closed.
    pub fn next_event(&mut self) -> Result<StreamEvent, StreamError> {
        loop {
            if !self.alive || self.state.is_closed() {
                self.release();
                return Err(StreamError::AlreadyClosed);
            }

            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return Err(self.die("end of stream".to_string())),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let reason = if self.state.is_closed() {
                        "closed by client".to_string()
                    } else {
                        e.to_string()
                    };
                    return Err(self.die(reason));
                }
            }

            let Ok(text) = std::str::from_utf8(&self.line) else {
                return Err(StreamError::Decode(DecodeError::Malformed(
                    "line is not valid UTF-8".to_string(),
                )));
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            tracing::trace!(line = text, "Received stream line");
            match self.decoder.decode_line(text) {
                Ok(event) => return Ok(event),
                Err(e) if e.is_tolerated() => {
                    tracing::debug!(error = %e, "Skipping unrecognised stream line");
                }
                Err(e) => return Err(StreamError::Decode(e)),
            }
        }
    }

    /// Close the stream and release the body
    pub fn close(&mut self) {
        self.state.close();
        self.release();
    }

    fn die(&mut self, reason: String) -> StreamError {
        tracing::debug!(reason = %reason, "Status stream closed");
        self.state.close();
        self.release();
        StreamError::Closed(reason)
    }

    fn release(&mut self) {
        if self.alive {
            self.alive = false;
            self.reader = BufReader::new(Box::new(io::empty()));
        }
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.state.close();
    }
}

impl fmt::Debug for StatusStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusStream")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}
