//! REST API
//!
//! [`Client`] exposes one blocking method per [`ApiMethod`]. It is the
//! building block for [`crate::AsyncClient`], which queues the same calls on
//! dispatcher threads.

mod client;
mod method;
mod paging;
mod rate_limit;

use std::fmt;

pub use client::Client;
pub use method::ApiMethod;
pub use paging::Paging;
pub use rate_limit::{RateLimitListeners, RateLimitScope, RateLimitStatusListener};

use crate::http::Parameter;

/// Names an account either by numeric id or by screen name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserRef {
    /// Numeric account id
    Id(u64),
    /// Handle without the leading `@`
    ScreenName(String),
}

impl UserRef {
    /// Request parameter selecting this account (`user_id` or `screen_name`)
    #[must_use]
    pub fn to_parameter(&self) -> Parameter {
        match self {
            Self::Id(id) => Parameter::new("user_id", id),
            Self::ScreenName(name) => Parameter::new("screen_name", name),
        }
    }

    /// Same account as a generic `id` parameter
    #[must_use]
    pub fn to_id_parameter(&self) -> Parameter {
        Parameter::new("id", self)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::ScreenName(name) => f.write_str(name),
        }
    }
}

impl From<u64> for UserRef {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        Self::ScreenName(name.trim_start_matches('@').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_ref_parameters() {
        assert_eq!(UserRef::from(42).to_parameter(), Parameter::new("user_id", 42));
        assert_eq!(
            UserRef::from("@alice").to_parameter(),
            Parameter::new("screen_name", "alice")
        );
        assert_eq!(UserRef::from("bob").to_id_parameter(), Parameter::new("id", "bob"));
    }
}
