use std::fmt;

/// Identifies which API operation produced a result or a failure
///
/// Async listeners receive it alongside errors so one listener can serve
/// many operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ApiMethod {
    PublicTimeline,
    HomeTimeline,
    FriendsTimeline,
    UserTimeline,
    Mentions,
    RetweetedByMe,
    RetweetedToMe,
    RetweetsOfMe,
    ShowStatus,
    UpdateStatus,
    DestroyStatus,
    RetweetStatus,
    Retweets,
    ShowUser,
    FriendsStatuses,
    FollowersStatuses,
    DirectMessages,
    SentDirectMessages,
    SendDirectMessage,
    DestroyDirectMessage,
    CreateFriendship,
    DestroyFriendship,
    ExistsFriendship,
    FriendsIds,
    FollowersIds,
    RateLimitStatus,
    VerifyCredentials,
    Favorites,
    CreateFavorite,
    DestroyFavorite,
    CreateBlock,
    DestroyBlock,
    ExistsBlock,
    BlockingUsers,
    Test,
}

impl ApiMethod {
    /// Every operation, in declaration order
    pub const ALL: [ApiMethod; 35] = [
        Self::PublicTimeline,
        Self::HomeTimeline,
        Self::FriendsTimeline,
        Self::UserTimeline,
        Self::Mentions,
        Self::RetweetedByMe,
        Self::RetweetedToMe,
        Self::RetweetsOfMe,
        Self::ShowStatus,
        Self::UpdateStatus,
        Self::DestroyStatus,
        Self::RetweetStatus,
        Self::Retweets,
        Self::ShowUser,
        Self::FriendsStatuses,
        Self::FollowersStatuses,
        Self::DirectMessages,
        Self::SentDirectMessages,
        Self::SendDirectMessage,
        Self::DestroyDirectMessage,
        Self::CreateFriendship,
        Self::DestroyFriendship,
        Self::ExistsFriendship,
        Self::FriendsIds,
        Self::FollowersIds,
        Self::RateLimitStatus,
        Self::VerifyCredentials,
        Self::Favorites,
        Self::CreateFavorite,
        Self::DestroyFavorite,
        Self::CreateBlock,
        Self::DestroyBlock,
        Self::ExistsBlock,
        Self::BlockingUsers,
        Self::Test,
    ];

    /// Stable upper-case identifier, e.g. `HOME_TIMELINE`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PublicTimeline => "PUBLIC_TIMELINE",
            Self::HomeTimeline => "HOME_TIMELINE",
            Self::FriendsTimeline => "FRIENDS_TIMELINE",
            Self::UserTimeline => "USER_TIMELINE",
            Self::Mentions => "MENTIONS",
            Self::RetweetedByMe => "RETWEETED_BY_ME",
            Self::RetweetedToMe => "RETWEETED_TO_ME",
            Self::RetweetsOfMe => "RETWEETS_OF_ME",
            Self::ShowStatus => "SHOW_STATUS",
            Self::UpdateStatus => "UPDATE_STATUS",
            Self::DestroyStatus => "DESTROY_STATUS",
            Self::RetweetStatus => "RETWEET_STATUS",
            Self::Retweets => "RETWEETS",
            Self::ShowUser => "SHOW_USER",
            Self::FriendsStatuses => "FRIENDS_STATUSES",
            Self::FollowersStatuses => "FOLLOWERS_STATUSES",
            Self::DirectMessages => "DIRECT_MESSAGES",
            Self::SentDirectMessages => "SENT_DIRECT_MESSAGES",
            Self::SendDirectMessage => "SEND_DIRECT_MESSAGE",
            Self::DestroyDirectMessage => "DESTROY_DIRECT_MESSAGE",
            Self::CreateFriendship => "CREATE_FRIENDSHIP",
            Self::DestroyFriendship => "DESTROY_FRIENDSHIP",
            Self::ExistsFriendship => "EXISTS_FRIENDSHIP",
            Self::FriendsIds => "FRIENDS_IDS",
            Self::FollowersIds => "FOLLOWERS_IDS",
            Self::RateLimitStatus => "RATE_LIMIT_STATUS",
            Self::VerifyCredentials => "VERIFY_CREDENTIALS",
            Self::Favorites => "FAVORITES",
            Self::CreateFavorite => "CREATE_FAVORITE",
            Self::DestroyFavorite => "DESTROY_FAVORITE",
            Self::CreateBlock => "CREATE_BLOCK",
            Self::DestroyBlock => "DESTROY_BLOCK",
            Self::ExistsBlock => "EXISTS_BLOCK",
            Self::BlockingUsers => "BLOCKING_USERS",
            Self::Test => "TEST",
        }
    }

    /// Whether the server rejects the call without credentials
    ///
    /// `UserTimeline`, `FriendsIds` and `FollowersIds` are public when a
    /// target user is named; the client checks those per call.
    #[must_use]
    pub fn requires_authentication(&self) -> bool {
        !matches!(
            self,
            Self::PublicTimeline
                | Self::UserTimeline
                | Self::ShowStatus
                | Self::Retweets
                | Self::ShowUser
                | Self::FriendsStatuses
                | Self::FollowersStatuses
                | Self::ExistsFriendship
                | Self::FriendsIds
                | Self::FollowersIds
                | Self::RateLimitStatus
                | Self::Test
        )
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = ApiMethod::ALL.iter().map(ApiMethod::name).collect();
        assert_eq!(names.len(), ApiMethod::ALL.len());
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(ApiMethod::HomeTimeline.to_string(), "HOME_TIMELINE");
        assert_eq!(ApiMethod::Test.to_string(), "TEST");
    }

    #[test]
    fn test_authentication_requirements() {
        assert!(!ApiMethod::PublicTimeline.requires_authentication());
        assert!(!ApiMethod::RateLimitStatus.requires_authentication());
        assert!(ApiMethod::HomeTimeline.requires_authentication());
        assert!(ApiMethod::UpdateStatus.requires_authentication());
        assert!(ApiMethod::VerifyCredentials.requires_authentication());
    }
}
