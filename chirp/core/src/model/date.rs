//! Wire timestamp format
//!
//! The API renders timestamps as `Wed Aug 27 13:08:45 +0000 2008`. Used as
//! `#[serde(default, with = "date")]` on `Option<DateTime<FixedOffset>>`
//! fields; absent and `null` values both become `None`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serializer};

/// `strftime` pattern of API timestamps
pub const WIRE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parse one API timestamp
///
/// # Errors
///
/// Returns the `chrono` parse error when the text does not match [`WIRE_FORMAT`].
pub fn parse(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(text, WIRE_FORMAT)
}

pub(crate) fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&dt.format(WIRE_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    text.map(|t| parse(&t).map_err(serde::de::Error::custom))
        .transpose()
}
