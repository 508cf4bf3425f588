//! HTTP Transport
//!
//! The transport is the only part of the client that touches the network. It
//! executes one blocking request and returns a response whose body is a byte
//! stream. REST calls read that body to the end; streaming calls hand it to a
//! [`crate::stream::StatusStream`] which reads it line by line for as long as
//! the server keeps the connection open.
//!
//! # Design Philosophy
//!
//! Everything above this module talks to the [`Transport`] trait, never to
//! `reqwest` directly. Tests plug in scripted transports; production code uses
//! [`ReqwestTransport`].

mod reqwest_transport;

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;

use thiserror::Error;

pub use reqwest_transport::ReqwestTransport;

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method used by the API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Query-string request
    Get,
    /// Form-encoded request body
    Post,
}

impl Method {
    /// Wire name of the method
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request parameter (query-string pair for GET, form field for POST)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter value, already rendered as text
    pub value: String,
}

impl Parameter {
    /// Create a parameter from anything displayable
    pub fn new(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Credentials attached to a request
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    /// No credentials; only public endpoints can be used
    #[default]
    Anonymous,
    /// HTTP Basic authentication
    Basic {
        /// Screen name or e-mail address
        user: String,
        /// Account password
        password: String,
    },
}

impl Authorization {
    /// Build Basic credentials
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Whether requests will carry credentials
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Basic { .. })
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"********")
                .finish(),
        }
    }
}

/// A fully described HTTP request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Query or form parameters, in order
    pub parameters: Vec<Parameter>,
    /// Credentials to attach
    pub authorization: Authorization,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a request with no parameters
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            parameters: Vec::new(),
            authorization: Authorization::Anonymous,
            headers: Vec::new(),
        }
    }

    /// Shorthand for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Shorthand for a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Append parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Attach credentials
    #[must_use]
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Add a request header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a parameter value by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Handle that can abort a response body from another thread
///
/// A reader blocked in `read()` must return (with an error or EOF) once
/// `disconnect` has been called.
pub trait Disconnect: Send + Sync {
    /// Tear down the underlying connection
    fn disconnect(&self);
}

/// Response returned by a [`Transport`]
pub struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Box<dyn Read + Send>,
    disconnect: Option<Arc<dyn Disconnect>>,
}

impl HttpResponse {
    /// Create a response around an arbitrary body reader
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Box::new(body),
            disconnect: None,
        }
    }

    /// Create a response with an in-memory body
    pub fn from_string(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Cursor::new(body.into().into_bytes()))
    }

    /// Add a header (names are stored lower-cased)
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a handle that aborts the body from another thread
    #[must_use]
    pub fn with_disconnect(mut self, handle: Arc<dyn Disconnect>) -> Self {
        self.disconnect = Some(handle);
        self
    }

    /// HTTP status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status code is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All response headers
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Split into the body reader and the optional disconnect handle
    #[must_use]
    pub fn into_body(self) -> (Box<dyn Read + Send>, Option<Arc<dyn Disconnect>>) {
        (self.body, self.disconnect)
    }

    /// Read the whole body as UTF-8 text
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the body cannot be read or is not UTF-8.
    pub fn text(self) -> Result<String, TransportError> {
        let mut body = self.body;
        let mut text = String::new();
        body.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("disconnectable", &self.disconnect.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Errors and Trait
// =============================================================================

/// Network-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established
    #[error("Failed to connect to {url}: {reason}")]
    Connect {
        /// Target URL
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// Connect or read timed out
    #[error("Request to {url} timed out")]
    Timeout {
        /// Target URL
        url: String,
    },

    /// The request could not be built (bad URL, bad header)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O failure while reading the body
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Executes one blocking HTTP request
///
/// Implementations must be usable from several threads at once: the
/// dispatcher workers and the stream supervisor share one transport.
pub trait Transport: Send + Sync {
    /// Perform the request and return the response, whatever its status code
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response could be obtained.
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("http://example.com/statuses/update.json")
            .with_parameters([Parameter::new("status", "hello"), Parameter::new("count", 5)])
            .with_authorization(Authorization::basic("alice", "secret"))
            .with_header("X-Chirp-Client", "chirp");

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.parameter("status"), Some("hello"));
        assert_eq!(request.parameter("count"), Some("5"));
        assert_eq!(request.parameter("missing"), None);
        assert!(request.authorization.is_enabled());
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_authorization_debug_hides_password() {
        let auth = Authorization::basic("alice", "hunter2");
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_response_headers_case_insensitive() {
        let response = HttpResponse::from_string(200, "{}").with_header("X-RateLimit-Limit", "150");
        assert_eq!(response.header("x-ratelimit-limit"), Some("150"));
        assert_eq!(response.header("X-RATELIMIT-LIMIT"), Some("150"));
        assert!(response.is_success());
    }

    #[test]
    fn test_response_text() {
        let response = HttpResponse::from_string(404, "not found");
        assert!(!response.is_success());
        assert_eq!(response.text().unwrap(), "not found");
    }
}
