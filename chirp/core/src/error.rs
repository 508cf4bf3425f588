//! Error Types
//!
//! Each layer has its own error enum ([`TransportError`], [`DecodeError`],
//! [`crate::dispatch::DispatchError`], [`crate::stream::StreamError`]).
//! [`ChirpError`] is what one-shot API operations return and what async
//! listeners receive in `on_exception`.

use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::http::TransportError;
use crate::model::DecodeError;

/// Failure of one API operation
#[derive(Debug, Error)]
pub enum ChirpError {
    /// No response could be obtained
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server-provided error text, or the raw body
        message: String,
    },

    /// The response body could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An argument was out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs credentials this client was not given
    #[error("{0} requires authentication")]
    MissingCredentials(String),

    /// The object is not in a state that allows the call
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl ChirpError {
    /// Whether trying again later may succeed
    ///
    /// True for network failures and 5xx answers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code, for [`ChirpError::Api`]
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DispatchError> for ChirpError {
    fn from(e: DispatchError) -> Self {
        Self::IllegalState(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let transport = ChirpError::from(TransportError::Timeout {
            url: "http://example.com".to_string(),
        });
        assert!(transport.is_retryable());

        let unavailable = ChirpError::Api {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.status_code(), Some(503));

        let unauthorized = ChirpError::Api {
            status: 401,
            message: "Could not authenticate you.".to_string(),
        };
        assert!(!unauthorized.is_retryable());

        let decode = ChirpError::from(DecodeError::Malformed("eof".to_string()));
        assert!(!decode.is_retryable());
        assert_eq!(decode.status_code(), None);
    }

    #[test]
    fn test_dispatch_error_becomes_illegal_state() {
        let err = ChirpError::from(DispatchError::AlreadyShutdown);
        assert!(matches!(err, ChirpError::IllegalState(_)));
        assert!(err.to_string().contains("Already shut down"));
    }

    #[test]
    fn test_display() {
        let err = ChirpError::MissingCredentials("HOME_TIMELINE".to_string());
        assert_eq!(err.to_string(), "HOME_TIMELINE requires authentication");
    }
}
