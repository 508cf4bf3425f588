use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{date, Status};

/// An account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Account id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Handle without the leading `@`
    pub screen_name: String,
    /// Free-text location
    pub location: Option<String>,
    /// Profile description
    pub description: Option<String>,
    /// Avatar URL
    pub profile_image_url: Option<String>,
    /// Home page URL
    pub url: Option<String>,
    /// Whether updates are only visible to approved followers
    pub protected: bool,
    /// Verified badge
    pub verified: bool,
    /// Follower count
    pub followers_count: u32,
    /// Following count
    pub friends_count: u32,
    /// Number of statuses posted
    pub statuses_count: u32,
    /// Number of favorites
    pub favourites_count: u32,
    /// Offset from UTC in seconds
    pub utc_offset: Option<i32>,
    /// Time zone name
    pub time_zone: Option<String>,
    /// Account creation time
    #[serde(with = "date")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Most recent status, when the endpoint embeds it
    pub status: Option<Box<Status>>,
}

/// One page of a cursored user listing
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPage {
    /// Users on this page
    pub users: Vec<User>,
    /// Cursor of the next page (0 when this is the last)
    pub next_cursor: i64,
    /// Cursor of the previous page (0 when this is the first)
    pub previous_cursor: i64,
}

impl UserPage {
    /// Whether a further page exists
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_cursor != 0
    }
}
