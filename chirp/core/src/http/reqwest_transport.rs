//! Blocking transport built on `reqwest`
//!
//! One instance wraps one `reqwest::blocking::Client` (and therefore one
//! connection pool). REST calls and streaming calls use separate instances
//! because their read timeouts differ by a factor of more than two.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};

use super::{Authorization, HttpRequest, HttpResponse, Method, Transport, TransportError};
use crate::config::HttpConfig;

/// Header carrying the configured client source name
pub const SOURCE_HEADER: &str = "X-Chirp-Client";

/// [`Transport`] implementation on `reqwest::blocking`
#[derive(Debug)]
pub struct ReqwestTransport {
    client: Client,
    retry_count: u32,
    retry_interval: Duration,
    source: Option<String>,
}

impl ReqwestTransport {
    /// Build a transport for one-shot REST calls
    ///
    /// Uses the REST read timeout and the configured retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the proxy URL is invalid
    /// or the TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config, config.read_timeout())?,
            retry_count: config.retry_count,
            retry_interval: config.retry_interval(),
            source: None,
        })
    }

    /// Build a transport for long-lived streaming connections
    ///
    /// Uses the streaming read timeout and never retries internally; the
    /// stream supervisor owns the reconnect policy.
    ///
    /// # Errors
    ///
    /// Same as [`ReqwestTransport::new`].
    pub fn streaming(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config, config.streaming_read_timeout())?,
            retry_count: 0,
            retry_interval: Duration::ZERO,
            source: None,
        })
    }

    /// Send the client source name with every request
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn prepare(&self, request: &HttpRequest) -> RequestBuilder {
        let pairs: Vec<(&str, &str)> = request
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect();

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url).query(&pairs),
            Method::Post => self.client.post(&request.url).form(&pairs),
        };

        if let Authorization::Basic { user, password } = &request.authorization {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(source) = &self.source {
            builder = builder.header(SOURCE_HEADER, source.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn execute_once(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .prepare(request)
            .send()
            .map_err(|e| map_error(&request.url, &e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let mut http_response = HttpResponse::new(status, response);
        for (name, value) in headers {
            http_response = http_response.with_header(name, value);
        }
        Ok(http_response)
    }
}

impl Transport for ReqwestTransport {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0;
        loop {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                "Sending request"
            );
            match self.execute_once(request) {
                Ok(response) => return Ok(response),
                Err(e)
                    if attempt < self.retry_count
                        && !matches!(e, TransportError::InvalidRequest(_)) =>
                {
                    attempt += 1;
                    tracing::warn!(
                        url = %request.url,
                        error = %e,
                        attempt,
                        retry_in_secs = self.retry_interval.as_secs(),
                        "Request failed, retrying after backoff"
                    );
                    thread::sleep(self.retry_interval);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn build_client(config: &HttpConfig, read_timeout: Duration) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(read_timeout)
        .user_agent(config.user_agent.clone());

    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| TransportError::InvalidRequest(format!("proxy {proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

fn map_error(url: &str, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Connect {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
