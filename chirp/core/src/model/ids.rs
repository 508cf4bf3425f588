use serde::{Deserialize, Deserializer, Serialize};

/// Account ids returned by the social graph endpoints
///
/// The API answers either with a bare array (uncursored) or with an object
/// carrying `ids` plus cursors; both decode into this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdList {
    /// Account ids
    pub ids: Vec<u64>,
    /// Cursor of the next page (0 when none)
    pub next_cursor: i64,
    /// Cursor of the previous page (0 when none)
    pub previous_cursor: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdListWire {
    Bare(Vec<u64>),
    Cursored {
        ids: Vec<u64>,
        #[serde(default)]
        next_cursor: i64,
        #[serde(default)]
        previous_cursor: i64,
    },
}

impl<'de> Deserialize<'de> for IdList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match IdListWire::deserialize(deserializer)? {
            IdListWire::Bare(ids) => Self {
                ids,
                ..Self::default()
            },
            IdListWire::Cursored {
                ids,
                next_cursor,
                previous_cursor,
            } => Self {
                ids,
                next_cursor,
                previous_cursor,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_body;

    #[test]
    fn test_decode_bare_array() {
        let ids: IdList = decode_body("[1, 2, 3]").unwrap();
        assert_eq!(ids.ids, vec![1, 2, 3]);
        assert_eq!(ids.next_cursor, 0);
    }

    #[test]
    fn test_decode_cursored_object() {
        let ids: IdList =
            decode_body(r#"{"ids": [5], "next_cursor": 10, "previous_cursor": -1}"#).unwrap();
        assert_eq!(ids.ids, vec![5]);
        assert_eq!(ids.next_cursor, 10);
        assert_eq!(ids.previous_cursor, -1);
    }

    #[test]
    fn test_decode_wrong_shape() {
        assert!(decode_body::<IdList>(r#"{"users": []}"#).is_err());
    }
}
