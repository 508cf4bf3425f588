//! API Records
//!
//! Plain data types decoded from API responses, plus the stream line
//! [`Decoder`]. All records derive `serde` traits and tolerate missing
//! fields, since the API omits whatever is not set.

pub mod date;
mod decode;
mod direct_message;
mod ids;
mod rate_limit;
mod status;
mod user;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use decode::{Decoder, JsonDecoder, StreamEvent};
pub use direct_message::DirectMessage;
pub use ids::IdList;
pub use rate_limit::{RateLimitStatus, LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};
pub use status::{Status, StatusDeletionNotice};
pub use user::{User, UserPage};

/// Decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or JSON with the wrong field types
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Valid JSON that is not a known record
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

impl DecodeError {
    /// Whether a stream reader skips this line without reporting it
    #[must_use]
    pub fn is_tolerated(&self) -> bool {
        matches!(self, Self::UnexpectedShape(_))
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Decode a complete response body
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the body does not match `T`.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, DecodeError> {
    Ok(serde_json::from_str(body)?)
}
