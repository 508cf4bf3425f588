use std::fmt;

use crate::error::ChirpError;
use crate::http::{HttpRequest, Method, Parameter};

/// Which stream to open, and with what parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRequest {
    /// Every public status
    Firehose {
        /// Backlog of earlier statuses to replay before going live
        count: i32,
    },
    /// Every public status containing a link
    Links {
        /// Backlog to replay
        count: i32,
    },
    /// Every retweet
    Retweet,
    /// A random sample of public statuses
    Sample,
    /// Statuses matching at least one predicate
    Filter {
        /// Backlog to replay
        count: i32,
        /// Account ids whose statuses to receive
        follow: Vec<u64>,
        /// Keywords to track
        track: Vec<String>,
    },
}

impl StreamRequest {
    /// Filter stream following `follow` and tracking `track`
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] when both lists are empty.
    pub fn filter(
        count: i32,
        follow: impl Into<Vec<u64>>,
        track: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ChirpError> {
        let request = Self::Filter {
            count,
            follow: follow.into(),
            track: track.into_iter().map(Into::into).collect(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Reject parameter combinations the server would refuse
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for a filter with no predicate.
    pub fn validate(&self) -> Result<(), ChirpError> {
        match self {
            Self::Filter { follow, track, .. } if follow.is_empty() && track.is_empty() => {
                Err(ChirpError::InvalidArgument(
                    "filter needs at least one of follow or track".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Path below the stream base URL
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Firehose { .. } => "statuses/firehose.json",
            Self::Links { .. } => "statuses/links.json",
            Self::Retweet => "statuses/retweet.json",
            Self::Sample => "statuses/sample.json",
            Self::Filter { .. } => "statuses/filter.json",
        }
    }

    /// HTTP method the endpoint expects
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::Sample => Method::Get,
            _ => Method::Post,
        }
    }

    /// Form or query parameters
    #[must_use]
    pub fn parameters(&self) -> Vec<Parameter> {
        match self {
            Self::Firehose { count } | Self::Links { count } => {
                vec![Parameter::new("count", count)]
            }
            Self::Retweet | Self::Sample => Vec::new(),
            Self::Filter {
                count,
                follow,
                track,
            } => {
                let mut parameters = vec![Parameter::new("count", count)];
                if !follow.is_empty() {
                    let ids: Vec<String> = follow.iter().map(u64::to_string).collect();
                    parameters.push(Parameter::new("follow", ids.join(",")));
                }
                if !track.is_empty() {
                    parameters.push(Parameter::new("track", track.join(",")));
                }
                parameters
            }
        }
    }

    /// Unauthenticated request against `base_url`
    #[must_use]
    pub fn to_http(&self, base_url: &str) -> HttpRequest {
        HttpRequest::new(self.method(), format!("{base_url}{}", self.path()))
            .with_parameters(self.parameters())
    }
}

impl fmt::Display for StreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Firehose { .. } => "firehose",
            Self::Links { .. } => "links",
            Self::Retweet => "retweet",
            Self::Sample => "sample",
            Self::Filter { .. } => "filter",
        };
        f.write_str(name)
    }
}
