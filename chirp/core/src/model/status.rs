use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{date, User};

/// One status update (a "tweet")
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    /// Status id
    pub id: u64,
    /// Body text
    pub text: String,
    /// Name (often an HTML link) of the posting client
    pub source: String,
    /// Creation time
    #[serde(with = "date")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Whether the text was cut to fit
    pub truncated: bool,
    /// Status this one replies to
    pub in_reply_to_status_id: Option<u64>,
    /// Author of the status this one replies to
    pub in_reply_to_user_id: Option<u64>,
    /// Screen name of that author
    pub in_reply_to_screen_name: Option<String>,
    /// Whether the authenticated account favorited it
    pub favorited: bool,
    /// Author, absent when embedded in a [`User`]
    pub user: Option<User>,
    /// Original status when this one is a retweet
    pub retweeted_status: Option<Box<Status>>,
}

impl Status {
    /// Whether this status is a retweet of another
    #[must_use]
    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    /// Screen name of the author, when the payload carries one
    #[must_use]
    pub fn screen_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.screen_name.as_str())
    }
}

/// Stream notice that a status was deleted by its author
///
/// Consumers that store statuses are expected to honour it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDeletionNotice {
    /// Deleted status
    pub status_id: u64,
    /// Its author
    pub user_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_body;

    #[test]
    fn test_decode_status_with_user() {
        let json = r#"{
            "id": 1234,
            "text": "hello world",
            "source": "web",
            "created_at": "Wed Aug 27 13:08:45 +0000 2008",
            "truncated": false,
            "in_reply_to_status_id": null,
            "favorited": false,
            "user": {"id": 7, "screen_name": "alice", "name": "Alice"}
        }"#;

        let status: Status = decode_body(json).unwrap();
        assert_eq!(status.id, 1234);
        assert_eq!(status.text, "hello world");
        assert_eq!(status.screen_name(), Some("alice"));
        assert!(status.created_at.is_some());
        assert!(status.in_reply_to_status_id.is_none());
        assert!(!status.is_retweet());
    }

    #[test]
    fn test_decode_retweet() {
        let json = r#"{
            "id": 2,
            "text": "RT @bob: original",
            "retweeted_status": {"id": 1, "text": "original"}
        }"#;

        let status: Status = decode_body(json).unwrap();
        assert!(status.is_retweet());
        assert_eq!(status.retweeted_status.unwrap().id, 1);
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let json = r#"{"id": 1, "text": "x", "created_at": "yesterday"}"#;
        assert!(decode_body::<Status>(json).is_err());
    }
}
