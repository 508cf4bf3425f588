//! Stream supervisor
//!
//! Runs one stream at a time on a dedicated thread and reconnects it under a
//! rolling attempt cap. Records reach the [`StatusListener`] in arrival order
//! on that thread.
//!
//! A restart closes the old run at once but never joins it from the caller.
//! The new thread waits for the old one to finish before it connects, so a
//! listener may restart the stream from inside a callback.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};

use super::{
    Clock, RetryHistory, ShutdownSignal, StatusListener, StatusStream, StreamCloser, StreamError,
    StreamRequest, SystemClock,
};
use crate::api::{RateLimitListeners, RateLimitScope};
use crate::config::{ChirpConfig, StreamConfig};
use crate::dispatch::panic_message;
use crate::error::ChirpError;
use crate::http::{Authorization, ReqwestTransport, Transport};
use crate::model::{Decoder, JsonDecoder, StreamEvent};

/// Longest error body echoed back when a stream cannot be opened
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Where the supervisor thread is in its loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing started yet
    Idle,
    /// Opening a connection
    Connecting,
    /// Delivering records
    Streaming,
    /// Waiting for the attempt window to free up, or about to reconnect
    Retrying,
    /// Stopped by `cleanup` or a new `start`
    ClosedByUser,
    /// The supervisor thread died unexpectedly
    Faulted,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Retrying => "retrying",
            Self::ClosedByUser => "closed by user",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Everything needed to open one stream
#[derive(Clone)]
struct Connector {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder>,
    base_url: String,
    authorization: Authorization,
    rate_limits: RateLimitListeners,
}

impl Connector {
    fn open(&self, request: &StreamRequest) -> Result<StatusStream, ChirpError> {
        let http = request
            .to_http(&self.base_url)
            .with_authorization(self.authorization.clone());
        tracing::debug!(stream = %request, url = %http.url, "Opening stream");

        let response = self.transport.request(&http)?;
        self.rate_limits
            .notify(response.headers(), RateLimitScope::Account);

        if !response.is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ChirpError::Api {
                status,
                message: body.trim().chars().take(MAX_ERROR_MESSAGE_CHARS).collect(),
            });
        }
        Ok(StatusStream::from_response(
            response,
            Arc::clone(&self.decoder),
        ))
    }
}

// =============================================================================
// Run Control
// =============================================================================

/// State shared between one supervisor thread and the threads that stop it
struct Control {
    signal: ShutdownSignal,
    current: Mutex<Option<StreamCloser>>,
    state: Mutex<StreamState>,
    /// Raised when the run's thread is done calling the listener
    finished: ShutdownSignal,
}

impl Control {
    fn new() -> Self {
        Self {
            signal: ShutdownSignal::new(),
            current: Mutex::new(None),
            state: Mutex::new(StreamState::Idle),
            finished: ShutdownSignal::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.signal.is_raised()
    }

    /// Raise the signal and close the live connection
    fn close(&self) {
        let mut current = self.current.lock();
        self.signal.raise();
        if let Some(closer) = current.take() {
            closer.close();
        }
    }

    /// Publish a new connection; `false` (and the connection closed) if the
    /// run was stopped in the meantime
    fn install(&self, closer: StreamCloser) -> bool {
        let mut current = self.current.lock();
        if self.signal.is_raised() {
            closer.close();
            return false;
        }
        *current = Some(closer);
        true
    }

    fn uninstall(&self) {
        self.current.lock().take();
    }
}

struct ActiveRun {
    control: Arc<Control>,
    handle: Option<JoinHandle<()>>,
}

fn join_unless_current(handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        return;
    }
    if handle.join().is_err() {
        tracing::error!("Stream thread terminated with a panic");
    }
}

// =============================================================================
// Worker Loop
// =============================================================================

struct Worker {
    connector: Connector,
    listener: Arc<dyn StatusListener>,
    clock: Arc<dyn Clock>,
    policy: StreamConfig,
    control: Arc<Control>,
    /// Run this one replaces
    previous: Option<Arc<Control>>,
}

impl Worker {
    fn run(self, request: StreamRequest) {
        if let Some(previous) = &self.previous {
            tracing::debug!(stream = %request, "Waiting for the previous stream to stop");
            previous.finished.wait();
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.supervise(&request)));
        if let Err(payload) = outcome {
            tracing::error!(
                stream = %request,
                panic = %panic_message(payload.as_ref()),
                "Stream supervisor panicked"
            );
            self.control.uninstall();
            self.transition(StreamState::Faulted);
        }
        self.control.finished.raise();
    }

    fn supervise(&self, request: &StreamRequest) {
        let mut history = RetryHistory::new(self.policy.retries_per_minute, self.policy.window);

        while !self.control.is_closed() {
            let now = self.clock.now();
            history.prune(now);

            if !history.has_capacity() {
                let wait = history.wait_time(now);
                self.transition(StreamState::Retrying);
                tracing::info!(
                    stream = %request,
                    attempts = history.len(),
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Connection attempt limit reached, backing off"
                );
                if self.clock.park(&self.control.signal, wait) {
                    break;
                }
                continue;
            }

            history.record(now);
            self.transition(StreamState::Connecting);
            let mut stream = match self.connector.open(request) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(stream = %request, error = %e, "Failed to open stream");
                    self.notify_exception(&StreamError::Open(e));
                    continue;
                }
            };

            if !self.control.install(stream.closer()) {
                break;
            }
            self.transition(StreamState::Streaming);
            tracing::info!(stream = %request, "Stream connected");

            let error = self.drain(&mut stream);
            self.control.uninstall();
            stream.close();

            if self.control.is_closed() {
                break;
            }
            tracing::warn!(stream = %request, error = %error, "Stream disconnected");
            self.notify_exception(&error);
            self.transition(StreamState::Retrying);
        }

        tracing::info!(stream = %request, "Stream supervisor stopped");
        self.transition(StreamState::ClosedByUser);
    }

    /// Deliver records until the connection dies; returns the terminal error
    fn drain(&self, stream: &mut StatusStream) -> StreamError {
        loop {
            if self.control.is_closed() {
                return StreamError::AlreadyClosed;
            }
            let event = stream.next_event();
            if self.control.is_closed() {
                return StreamError::AlreadyClosed;
            }
            match event {
                Ok(StreamEvent::Status(status)) => {
                    guarded("on_status", || self.listener.on_status(*status));
                }
                Ok(StreamEvent::Deletion(notice)) => {
                    guarded("on_deletion_notice", || {
                        self.listener.on_deletion_notice(notice);
                    });
                }
                Ok(StreamEvent::TrackLimitation(withheld)) => {
                    guarded("on_track_limitation_notice", || {
                        self.listener.on_track_limitation_notice(withheld);
                    });
                }
                Err(e) if !e.is_terminal() => {
                    tracing::debug!(error = %e, "Skipping undecodable stream line");
                    self.notify_exception(&e);
                }
                Err(e) => return e,
            }
        }
    }

    fn transition(&self, state: StreamState) {
        {
            let mut current = self.control.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        tracing::debug!(state = %state, "Stream state changed");
        // A closed run only reports how it ended
        let terminal = matches!(state, StreamState::ClosedByUser | StreamState::Faulted);
        if self.control.is_closed() && !terminal {
            return;
        }
        guarded("on_state_change", || self.listener.on_state_change(state));
    }

    fn notify_exception(&self, error: &StreamError) {
        if self.control.is_closed() {
            return;
        }
        guarded("on_exception", || self.listener.on_exception(error));
    }
}

/// Run a listener callback, logging instead of unwinding if it panics
fn guarded(callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(
            callback,
            panic = %panic_message(payload.as_ref()),
            "Status listener panicked"
        );
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Reconnecting stream client
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chirp_core::{ChirpConfig, Credentials, Status, StatusListener, StreamSupervisor};
///
/// struct Printer;
///
/// impl StatusListener for Printer {
///     fn on_status(&self, status: Status) {
///         println!("{}", status.text);
///     }
/// }
///
/// let config = ChirpConfig::default().with_credentials(Credentials::new("alice", "secret"));
/// let supervisor = StreamSupervisor::new(&config)?.with_listener(Arc::new(Printer));
/// supervisor.sample()?;
/// supervisor.join();
/// # Ok::<(), chirp_core::ChirpError>(())
/// ```
pub struct StreamSupervisor {
    connector: Connector,
    policy: StreamConfig,
    clock: Arc<dyn Clock>,
    listener: RwLock<Option<Arc<dyn StatusListener>>>,
    active: Mutex<Option<ActiveRun>>,
}

impl StreamSupervisor {
    /// Create a supervisor on a streaming `reqwest` transport
    ///
    /// # Errors
    ///
    /// [`ChirpError::MissingCredentials`] without credentials,
    /// [`ChirpError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ChirpConfig) -> Result<Self, ChirpError> {
        require_credentials(config)?;
        let transport =
            ReqwestTransport::streaming(&config.http)?.with_source(config.api.source.clone());
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a supervisor on any transport
    ///
    /// # Errors
    ///
    /// [`ChirpError::MissingCredentials`] without credentials.
    pub fn with_transport(
        config: &ChirpConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ChirpError> {
        require_credentials(config)?;
        Ok(Self {
            connector: Connector {
                transport,
                decoder: Arc::new(JsonDecoder),
                base_url: config.api.stream_base_url.clone(),
                authorization: config.authorization(),
                rate_limits: RateLimitListeners::new(),
            },
            policy: config.stream.clone(),
            clock: Arc::new(SystemClock),
            listener: RwLock::new(None),
            active: Mutex::new(None),
        })
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the line decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.connector.decoder = decoder;
        self
    }

    /// Set the listener at construction
    #[must_use]
    pub fn with_listener(self, listener: Arc<dyn StatusListener>) -> Self {
        self.set_listener(listener);
        self
    }

    /// Set the listener used by the next `start`
    pub fn set_listener(&self, listener: Arc<dyn StatusListener>) {
        *self.listener.write() = Some(listener);
    }

    /// Rate-limit listener registry, fed from stream response headers
    #[must_use]
    pub fn rate_limit_listeners(&self) -> &RateLimitListeners {
        &self.connector.rate_limits
    }

    /// State of the current (or last) run
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.active
            .lock()
            .as_ref()
            .map_or(StreamState::Idle, |run| *run.control.state.lock())
    }

    // =========================================================================
    // Stream Variants
    // =========================================================================

    /// Follow every public status, replaying `count` earlier ones
    ///
    /// # Errors
    ///
    /// Same as [`StreamSupervisor::start`].
    pub fn firehose(&self, count: i32) -> Result<(), ChirpError> {
        self.start(StreamRequest::Firehose { count })
    }

    /// Follow public statuses that contain links
    ///
    /// # Errors
    ///
    /// Same as [`StreamSupervisor::start`].
    pub fn links(&self, count: i32) -> Result<(), ChirpError> {
        self.start(StreamRequest::Links { count })
    }

    /// Follow all retweets
    ///
    /// # Errors
    ///
    /// Same as [`StreamSupervisor::start`].
    pub fn retweet(&self) -> Result<(), ChirpError> {
        self.start(StreamRequest::Retweet)
    }

    /// Follow a random sample of public statuses
    ///
    /// # Errors
    ///
    /// Same as [`StreamSupervisor::start`].
    pub fn sample(&self) -> Result<(), ChirpError> {
        self.start(StreamRequest::Sample)
    }

    /// Follow statuses by `follow` accounts or matching `track` keywords
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] when both lists are empty, otherwise
    /// same as [`StreamSupervisor::start`].
    pub fn filter(
        &self,
        count: i32,
        follow: impl Into<Vec<u64>>,
        track: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), ChirpError> {
        self.start(StreamRequest::filter(count, follow, track)?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start supervising `request`, replacing any running stream
    ///
    /// The previous run is closed before this returns. The new run does not
    /// connect until the previous thread has finished, so two runs never
    /// overlap. Safe to call from a listener callback.
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for an invalid request,
    /// [`ChirpError::IllegalState`] when no listener is set or the thread
    /// cannot be spawned.
    pub fn start(&self, request: StreamRequest) -> Result<(), ChirpError> {
        request.validate()?;
        let listener = self.listener.read().clone().ok_or_else(|| {
            ChirpError::IllegalState("status listener is not set".to_string())
        })?;

        // Never blocks while held: closing only raises flags and disconnects
        let mut active = self.active.lock();
        let previous = active.take().map(|run| {
            tracing::debug!("Stopping previous stream before starting a new one");
            run.control.close();
            run.control
        });

        let control = Arc::new(Control::new());
        let worker = Worker {
            connector: self.connector.clone(),
            listener,
            clock: Arc::clone(&self.clock),
            policy: self.policy.clone(),
            control: Arc::clone(&control),
            previous,
        };
        let name = format!("chirp-stream[{request}]");
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run(request))
            .map_err(|e| ChirpError::IllegalState(format!("failed to spawn {name}: {e}")))?;

        tracing::info!(thread = %name, "Stream supervisor started");
        *active = Some(ActiveRun {
            control,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Open one unsupervised stream on the calling thread
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for an invalid request, otherwise any
    /// error from opening the connection.
    pub fn open_stream(&self, request: &StreamRequest) -> Result<StatusStream, ChirpError> {
        request.validate()?;
        self.connector.open(request)
    }

    /// Stop the running stream without waiting for its thread
    ///
    /// The live connection is closed and the supervisor stops reconnecting.
    /// Calling it with nothing running is harmless.
    pub fn cleanup(&self) {
        if let Some(run) = self.active.lock().as_ref() {
            tracing::debug!("Closing stream");
            run.control.close();
        }
    }

    /// Block until the current run's thread exits
    ///
    /// Runs it replaced have finished by then too. Returns at once when
    /// nothing runs or when called from the supervisor thread itself.
    pub fn join(&self) {
        let handle = self
            .active
            .lock()
            .as_mut()
            .and_then(|run| run.handle.take());
        if let Some(handle) = handle {
            join_unless_current(handle);
        }
    }
}

impl Drop for StreamSupervisor {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl fmt::Debug for StreamSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSupervisor")
            .field("base_url", &self.connector.base_url)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .field("has_listener", &self.listener.read().is_some())
            .finish_non_exhaustive()
    }
}

fn require_credentials(config: &ChirpConfig) -> Result<(), ChirpError> {
    if config.credentials.is_none() {
        return Err(ChirpError::MissingCredentials(
            "Streaming API".to_string(),
        ));
    }
    Ok(())
}
