//! Chirp Core - Microblogging API Client
//!
//! Blocking REST client, fire-and-forget async facade, and a reconnecting
//! streaming supervisor. All I/O is blocking and runs on dedicated threads;
//! there is no async runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Caller threads                           │
//! │     Client::home_timeline()      AsyncClient::home_timeline()    │
//! └───────────┬──────────────────────────────┬───────────────────────┘
//!             │ blocking                     │ submit (never blocks)
//!             │                     ┌────────▼────────┐
//!             │                     │   Dispatcher    │ FIFO queue
//!             │                     │  worker[0..n]   │ ─▶ ApiListener
//!             │                     └────────┬────────┘
//! ┌───────────▼──────────────────────────────▼───────────────────────┐
//! │                    Client (REST operations)                      │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │              Transport (reqwest::blocking, or a fake)            │
//! └───────────────────────────────▲──────────────────────────────────┘
//!                                 │ long-lived body
//! ┌───────────────────────────────┴──────────────────────────────────┐
//! │  StreamSupervisor ─▶ StatusStream ─▶ Decoder ─▶ StatusListener   │
//! │  (retry cap over a rolling window, one thread per stream)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChirpConfig`]: Explicit configuration (file, environment, overrides)
//! - [`Client`]: One blocking method per API operation
//! - [`AsyncClient`]: The same operations, delivered to an [`ApiListener`]
//! - [`Dispatcher`]: Worker pool behind the async facade
//! - [`StreamSupervisor`]: Reconnecting stream consumer
//! - [`StatusStream`]: Pull-style reader over one stream connection
//!
//! # Quick Start
//!
//! ```no_run
//! use chirp_core::{load_config, Client, Paging};
//!
//! let config = load_config()?;
//! let client = Client::new(&config)?;
//! for status in client.home_timeline(Paging::new().with_count(5))? {
//!     println!("{}: {}", status.screen_name().unwrap_or("?"), status.text);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: Configuration structs and layered loading
//! - [`http`]: Request/response types and the [`Transport`] seam
//! - [`model`]: Decoded API records and the stream line [`Decoder`]
//! - [`api`]: The blocking [`Client`] and its operation table
//! - [`dispatch`]: The worker pool
//! - [`facade`]: The async client and listener
//! - [`stream`]: Stream connection, retry window and supervisor
//!
//! The library never installs a `tracing` subscriber; binaries do.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod http;
pub mod model;
pub mod stream;

// Re-exports for convenience
pub use api::{
    ApiMethod, Client, Paging, RateLimitListeners, RateLimitScope, RateLimitStatusListener,
    UserRef,
};
pub use config::{
    load_config, load_config_from_path, ApiConfig, ChirpConfig, ConfigError, ConfigOverrides,
    ConfigSource, Credentials, DispatcherConfig, HttpConfig, StreamConfig,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use error::ChirpError;
pub use facade::{ApiListener, ApiResponse, AsyncClient, AsyncTask, NoopListener};
pub use http::{
    Authorization, Disconnect, HttpRequest, HttpResponse, Method, Parameter, ReqwestTransport,
    Transport, TransportError,
};
pub use model::{
    DecodeError, Decoder, DirectMessage, IdList, JsonDecoder, RateLimitStatus, Status,
    StatusDeletionNotice, StreamEvent, User, UserPage,
};
pub use stream::{
    Clock, ManualClock, RetryHistory, ShutdownSignal, StatusListener, StatusStream, StreamCloser,
    StreamError, StreamRequest, StreamState, StreamSupervisor, SystemClock,
};
