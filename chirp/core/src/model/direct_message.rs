use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{date, User};

/// A private message between two accounts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectMessage {
    /// Message id
    pub id: u64,
    /// Body text
    pub text: String,
    /// Sending account id
    pub sender_id: u64,
    /// Receiving account id
    pub recipient_id: u64,
    /// Sending account handle
    pub sender_screen_name: String,
    /// Receiving account handle
    pub recipient_screen_name: String,
    /// Send time
    #[serde(with = "date")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Full sender record
    pub sender: Option<User>,
    /// Full recipient record
    pub recipient: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_body;

    #[test]
    fn test_decode_direct_message_list() {
        let json = r#"[
            {"id": 1, "text": "hi", "sender_id": 2, "recipient_id": 3,
             "sender_screen_name": "bob", "recipient_screen_name": "carol"},
            {"id": 4, "text": "yo", "sender": {"id": 3, "screen_name": "carol"}}
        ]"#;

        let messages: Vec<DirectMessage> = decode_body(json).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_screen_name, "bob");
        assert_eq!(messages[1].sender.as_ref().unwrap().screen_name, "carol");
    }
}
