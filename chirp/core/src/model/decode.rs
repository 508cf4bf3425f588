//! Stream line decoding
//!
//! Each line of a status stream is one JSON object. Its shape decides what it
//! is:
//!
//! | shape                                    | event                         |
//! |------------------------------------------|-------------------------------|
//! | has a non-null `text`                    | [`StreamEvent::Status`]       |
//! | `{"delete": {"status": {id, user_id}}}`  | [`StreamEvent::Deletion`]     |
//! | `{"limit": {"track": n}}`                | [`StreamEvent::TrackLimitation`] |
//! | anything else that is valid JSON         | [`DecodeError::UnexpectedShape`] |

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{DecodeError, Status, StatusDeletionNotice};

/// One decoded stream record
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A status update
    Status(Box<Status>),
    /// A status was deleted
    Deletion(StatusDeletionNotice),
    /// This many matching statuses were withheld by a track limit
    TrackLimitation(u64),
}

/// Turns one text line into a [`StreamEvent`]
pub trait Decoder: Send + Sync {
    /// Decode a single non-empty line
    ///
    /// # Errors
    ///
    /// [`DecodeError::Malformed`] when the line is not usable JSON,
    /// [`DecodeError::UnexpectedShape`] when it is JSON of an unknown kind.
    fn decode_line(&self, line: &str) -> Result<StreamEvent, DecodeError>;
}

/// The default JSON decoder
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode_line(&self, line: &str) -> Result<StreamEvent, DecodeError> {
        let value: Value = serde_json::from_str(line)?;
        let Value::Object(object) = &value else {
            return Err(DecodeError::UnexpectedShape(format!(
                "expected an object, got {}",
                kind(&value)
            )));
        };

        if object.get("text").is_some_and(|t| !t.is_null()) {
            let status = Status::deserialize(value)?;
            return Ok(StreamEvent::Status(Box::new(status)));
        }
        if let Some(delete) = object.get("delete").filter(|d| !d.is_null()) {
            return deletion(delete).map(StreamEvent::Deletion);
        }
        if let Some(limit) = object.get("limit").filter(|l| !l.is_null()) {
            return limit
                .get("track")
                .and_then(Value::as_u64)
                .map(StreamEvent::TrackLimitation)
                .ok_or_else(|| DecodeError::UnexpectedShape("limit without track".to_string()));
        }

        Err(DecodeError::UnexpectedShape(format!(
            "unknown record with keys [{}]",
            keys(object)
        )))
    }
}

fn deletion(delete: &Value) -> Result<StatusDeletionNotice, DecodeError> {
    let status = delete.get("status");
    let field = |name: &str| status.and_then(|s| s.get(name)).and_then(Value::as_u64);

    match (field("id"), field("user_id")) {
        (Some(status_id), Some(user_id)) => Ok(StatusDeletionNotice { status_id, user_id }),
        _ => Err(DecodeError::UnexpectedShape(
            "delete without status id and user_id".to_string(),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn keys(object: &Map<String, Value>) -> String {
    object.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(line: &str) -> Result<StreamEvent, DecodeError> {
        JsonDecoder.decode_line(line)
    }

    #[test]
    fn test_status_line() {
        let event = decode(r#"{"id": 1, "text": "a", "user": {"id": 9, "screen_name": "z"}}"#)
            .unwrap();
        let StreamEvent::Status(status) = event else {
            panic!("expected status, got {event:?}");
        };
        assert_eq!(status.id, 1);
        assert_eq!(status.text, "a");
    }

    #[test]
    fn test_deletion_line() {
        let event = decode(r#"{"delete": {"status": {"id": 1234, "user_id": 3}}}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Deletion(StatusDeletionNotice {
                status_id: 1234,
                user_id: 3
            })
        );
    }

    #[test]
    fn test_limit_line() {
        let event = decode(r#"{"limit": {"track": 42}}"#).unwrap();
        assert_eq!(event, StreamEvent::TrackLimitation(42));
    }

    #[test]
    fn test_null_text_is_not_a_status() {
        let err = decode(r#"{"text": null, "id": 5}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedShape(_)));
    }

    #[test]
    fn test_incomplete_deletion_is_unexpected_shape() {
        let err = decode(r#"{"delete": {"status": {"id": 1}}}"#).unwrap_err();
        assert!(err.is_tolerated());
    }

    #[test]
    fn test_non_object_is_unexpected_shape() {
        let err = decode("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_malformed_line() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
        assert!(!err.is_tolerated());
    }

    #[test]
    fn test_status_with_wrong_types_is_malformed() {
        let err = decode(r#"{"id": "one", "text": "a"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
