//! Client Configuration
//!
//! Every tunable of the client lives in one explicit [`ChirpConfig`] value
//! that is handed to [`crate::Client`], [`crate::AsyncClient`] and
//! [`crate::StreamSupervisor`] at construction time. Nothing is read from
//! process-wide state after that.
//!
//! # Layering
//!
//! Later layers win:
//! 1. Built-in defaults
//! 2. `$XDG_CONFIG_HOME/chirp/chirp.toml` (usually `~/.config/chirp/chirp.toml`)
//! 3. `CHIRP_*` environment variables
//! 4. [`ConfigOverrides`] from the command line
//!
//! # Example File
//!
//! ```toml
//! [http]
//! connect_timeout_ms = 20000
//! read_timeout_ms = 120000
//! streaming_read_timeout_ms = 300000
//! retry_count = 2
//! retry_interval_secs = 5
//!
//! [api]
//! rest_base_url = "http://api.twitter.com/1/"
//! stream_base_url = "http://stream.twitter.com/1/"
//!
//! [credentials]
//! user = "alice"
//! password = "secret"
//!
//! [dispatcher]
//! num_threads = 2
//!
//! [stream]
//! retries_per_minute = 1
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::Authorization;

// =============================================================================
// Error Types
// =============================================================================

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Cannot read {path}: {source}")]
    ReadError {
        /// File that was opened
        path: PathBuf,
        /// I/O cause
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`ChirpConfig`]
    #[error("Bad config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid config value: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Highest layer that contributed to a [`ChirpConfig`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line overrides
    Cli,
    /// `CHIRP_*` variables
    Env,
    /// The TOML file
    File,
    /// Nothing but built-in values
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cli => "command line",
            Self::Env => "environment",
            Self::File => "file",
            Self::Default => "defaults",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Configuration Sections
// =============================================================================

/// Network settings shared by REST and streaming transports
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpConfig {
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout for one-shot calls in milliseconds
    pub read_timeout_ms: u64,
    /// Read timeout for streaming connections in milliseconds
    pub streaming_read_timeout_ms: u64,
    /// Extra attempts after a network failure (one-shot calls only)
    pub retry_count: u32,
    /// Pause between those attempts in seconds
    pub retry_interval_secs: u64,
    /// User-Agent header
    pub user_agent: String,
    /// Optional proxy URL
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 20_000,
            read_timeout_ms: 120_000,
            streaming_read_timeout_ms: 300_000,
            retry_count: 0,
            retry_interval_secs: 5,
            user_agent: format!("chirp/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl HttpConfig {
    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// REST read timeout as a [`Duration`]
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Streaming read timeout as a [`Duration`]
    #[must_use]
    pub fn streaming_read_timeout(&self) -> Duration {
        Duration::from_millis(self.streaming_read_timeout_ms)
    }

    /// Retry pause as a [`Duration`]
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Endpoint settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the REST API, with trailing slash
    pub rest_base_url: String,
    /// Base URL of the streaming API, with trailing slash
    pub stream_base_url: String,
    /// Client name sent with status updates
    pub source: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "http://api.twitter.com/1/".to_string(),
            stream_base_url: "http://stream.twitter.com/1/".to_string(),
            source: "chirp".to_string(),
        }
    }
}

/// Account credentials for Basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Screen name or e-mail address
    pub user: String,
    /// Account password
    pub password: String,
    /// Numeric id of the account, when known
    pub user_id: Option<u64>,
}

impl Credentials {
    /// Create credentials without a known user id
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            user_id: None,
        }
    }

    /// Request authorization carrying these credentials
    #[must_use]
    pub fn authorization(&self) -> Authorization {
        Authorization::basic(self.user.clone(), self.password.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Worker pool settings for the async facade
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Thread name prefix
    pub name: String,
    /// Number of worker threads (at least 1)
    pub num_threads: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "chirp-async-dispatcher".to_string(),
            num_threads: 1,
        }
    }
}

/// Longest accepted rolling window
pub const MAX_STREAM_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Reconnect policy of the stream supervisor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Connection attempts allowed per window (at least 1)
    pub retries_per_minute: usize,
    /// Length of the rolling window
    pub window: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retries_per_minute: 1,
            window: Duration::from_secs(60),
        }
    }
}

impl StreamConfig {
    /// Create a policy with the default window
    #[must_use]
    pub fn new(retries_per_minute: usize) -> Self {
        Self {
            retries_per_minute,
            ..Self::default()
        }
    }

    /// Override the window length
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// HTTP section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpToml {
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// REST read timeout in milliseconds
    pub read_timeout_ms: Option<u64>,

    /// Streaming read timeout in milliseconds
    pub streaming_read_timeout_ms: Option<u64>,

    /// Retry attempts for one-shot calls
    pub retry_count: Option<u32>,

    /// Seconds between retries
    pub retry_interval_secs: Option<u64>,

    /// User-Agent header
    pub user_agent: Option<String>,

    /// Proxy URL
    pub proxy: Option<String>,
}

/// API section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// REST base URL
    pub rest_base_url: Option<String>,

    /// Streaming base URL
    pub stream_base_url: Option<String>,

    /// Client source name
    pub source: Option<String>,
}

/// Credentials section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsToml {
    /// Screen name
    pub user: Option<String>,

    /// Password
    pub password: Option<String>,

    /// Numeric user id
    pub user_id: Option<u64>,
}

/// Dispatcher section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherToml {
    /// Thread name prefix
    pub name: Option<String>,

    /// Worker thread count
    pub num_threads: Option<usize>,
}

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// Connection attempts per rolling window
    pub retries_per_minute: Option<usize>,

    /// Window length in seconds
    pub window_secs: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChirpToml {
    /// HTTP section
    pub http: HttpToml,

    /// API section
    pub api: ApiToml,

    /// Credentials section
    pub credentials: CredentialsToml,

    /// Dispatcher section
    pub dispatcher: DispatcherToml,

    /// Stream section
    pub stream: StreamToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Complete client configuration
///
/// Use [`load_config`] to load it with proper priority handling, or build
/// one directly from [`ChirpConfig::default`] in tests.
#[derive(Clone, Debug)]
pub struct ChirpConfig {
    /// Network settings
    pub http: HttpConfig,

    /// Endpoint settings
    pub api: ApiConfig,

    /// Basic-auth credentials (anonymous when absent)
    pub credentials: Option<Credentials>,

    /// Async worker pool settings
    pub dispatcher: DispatcherConfig,

    /// Stream reconnect policy
    pub stream: StreamConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            api: ApiConfig::default(),
            credentials: None,
            dispatcher: DispatcherConfig::default(),
            stream: StreamConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChirpConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the dispatcher thread count
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.dispatcher.num_threads = num_threads;
        self
    }

    /// Set the stream reconnect policy
    #[must_use]
    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Request authorization for the configured credentials
    #[must_use]
    pub fn authorization(&self) -> Authorization {
        self.credentials
            .as_ref()
            .map_or(Authorization::Anonymous, Credentials::authorization)
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.num_threads == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.num_threads must be at least 1".to_string(),
            ));
        }
        if self.stream.retries_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "stream.retries_per_minute must be at least 1".to_string(),
            ));
        }
        if self.stream.window.is_zero() {
            return Err(ConfigError::ValidationError(
                "stream.window_secs must be positive".to_string(),
            ));
        }
        if self.stream.window > MAX_STREAM_WINDOW {
            return Err(ConfigError::ValidationError(format!(
                "stream.window_secs must be at most {}",
                MAX_STREAM_WINDOW.as_secs()
            )));
        }
        for (name, url) in [
            ("api.rest_base_url", &self.api.rest_base_url),
            ("api.stream_base_url", &self.api.stream_base_url),
        ] {
            if !url.ends_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must end with '/': {url}"
                )));
            }
        }
        if let Some(credentials) = &self.credentials {
            if credentials.user.is_empty() {
                return Err(ConfigError::ValidationError(
                    "credentials.user must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chirp/chirp.toml` or
/// `~/.config/chirp/chirp.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chirp").join("chirp.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged configuration fails [`ChirpConfig::validate`].
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChirpConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChirpConfig, ConfigError> {
    let mut config = ChirpConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChirpToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut ChirpConfig, toml: &ChirpToml) {
    // HTTP settings
    if let Some(timeout) = toml.http.connect_timeout_ms {
        config.http.connect_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.http.read_timeout_ms {
        config.http.read_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.http.streaming_read_timeout_ms {
        config.http.streaming_read_timeout_ms = timeout;
    }
    if let Some(count) = toml.http.retry_count {
        config.http.retry_count = count;
    }
    if let Some(interval) = toml.http.retry_interval_secs {
        config.http.retry_interval_secs = interval;
    }
    if let Some(ref agent) = toml.http.user_agent {
        config.http.user_agent.clone_from(agent);
    }
    if toml.http.proxy.is_some() {
        config.http.proxy.clone_from(&toml.http.proxy);
    }

    // API settings
    if let Some(ref url) = toml.api.rest_base_url {
        config.api.rest_base_url.clone_from(url);
    }
    if let Some(ref url) = toml.api.stream_base_url {
        config.api.stream_base_url.clone_from(url);
    }
    if let Some(ref source) = toml.api.source {
        config.api.source.clone_from(source);
    }

    // Credentials need both halves
    if let (Some(user), Some(password)) = (&toml.credentials.user, &toml.credentials.password) {
        config.credentials = Some(Credentials {
            user: user.clone(),
            password: password.clone(),
            user_id: toml.credentials.user_id,
        });
    }

    // Dispatcher settings
    if let Some(ref name) = toml.dispatcher.name {
        config.dispatcher.name.clone_from(name);
    }
    if let Some(threads) = toml.dispatcher.num_threads {
        config.dispatcher.num_threads = threads;
    }

    // Stream settings
    if let Some(retries) = toml.stream.retries_per_minute {
        config.stream.retries_per_minute = retries;
    }
    if let Some(window) = toml.stream.window_secs {
        config.stream.window = Duration::from_secs(window);
    }
}

fn apply_env_config(config: &mut ChirpConfig) {
    if let Ok(timeout) = std::env::var("CHIRP_CONNECT_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.http.connect_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(timeout) = std::env::var("CHIRP_READ_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.http.read_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(timeout) = std::env::var("CHIRP_STREAM_READ_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.http.streaming_read_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(count) = std::env::var("CHIRP_RETRY_COUNT") {
        if let Ok(n) = count.parse::<u32>() {
            config.http.retry_count = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(proxy) = std::env::var("CHIRP_PROXY") {
        config.http.proxy = Some(proxy);
        config.source = ConfigSource::Env;
    }
    if let Ok(url) = std::env::var("CHIRP_REST_BASE_URL") {
        config.api.rest_base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Ok(url) = std::env::var("CHIRP_STREAM_BASE_URL") {
        config.api.stream_base_url = url;
        config.source = ConfigSource::Env;
    }
    if let (Ok(user), Ok(password)) = (
        std::env::var("CHIRP_USER"),
        std::env::var("CHIRP_PASSWORD"),
    ) {
        let user_id = config.credentials.as_ref().and_then(|c| c.user_id);
        config.credentials = Some(Credentials {
            user,
            password,
            user_id,
        });
        config.source = ConfigSource::Env;
    }
    if let Ok(threads) = std::env::var("CHIRP_ASYNC_THREADS") {
        if let Ok(n) = threads.parse::<usize>() {
            config.dispatcher.num_threads = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(retries) = std::env::var("CHIRP_STREAM_RETRIES_PER_MINUTE") {
        if let Ok(n) = retries.parse::<usize>() {
            config.stream.retries_per_minute = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Credentials override
    pub credentials: Option<Credentials>,

    /// Worker thread count override
    pub num_threads: Option<usize>,

    /// Streaming base URL override
    pub stream_base_url: Option<String>,

    /// Streaming read timeout override (milliseconds)
    pub streaming_read_timeout_ms: Option<u64>,

    /// Stream attempts-per-window override
    pub retries_per_minute: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set credentials override
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set worker thread count override
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set streaming base URL override
    #[must_use]
    pub fn with_stream_base_url(mut self, url: String) -> Self {
        self.stream_base_url = Some(url);
        self
    }

    /// Set streaming read timeout override
    #[must_use]
    pub fn with_streaming_read_timeout_ms(mut self, ms: u64) -> Self {
        self.streaming_read_timeout_ms = Some(ms);
        self
    }

    /// Set stream attempts-per-window override
    #[must_use]
    pub fn with_retries_per_minute(mut self, retries: usize) -> Self {
        self.retries_per_minute = Some(retries);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChirpConfig) {
        if self.credentials.is_some()
            || self.num_threads.is_some()
            || self.stream_base_url.is_some()
            || self.streaming_read_timeout_ms.is_some()
            || self.retries_per_minute.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref credentials) = self.credentials {
            config.credentials = Some(credentials.clone());
        }
        if let Some(threads) = self.num_threads {
            config.dispatcher.num_threads = threads;
        }
        if let Some(ref url) = self.stream_base_url {
            config.api.stream_base_url.clone_from(url);
        }
        if let Some(ms) = self.streaming_read_timeout_ms {
            config.http.streaming_read_timeout_ms = ms;
        }
        if let Some(retries) = self.retries_per_minute {
            config.stream.retries_per_minute = retries;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
