use crate::api::ApiMethod;
use crate::error::ChirpError;
use crate::model::{DirectMessage, IdList, RateLimitStatus, Status, User, UserPage};

/// Receives the outcome of async API calls
///
/// There is one success callback per operation and one shared failure
/// callback. Every method has an empty default body, so implementers override
/// only what they use. Callbacks run on dispatcher worker threads, never on
/// the thread that made the call.
#[allow(unused_variables)]
pub trait ApiListener: Send + Sync {
    // Timelines

    /// Result of [`crate::AsyncClient::public_timeline`]
    fn got_public_timeline(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::home_timeline`]
    fn got_home_timeline(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::friends_timeline`]
    fn got_friends_timeline(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::user_timeline`]
    fn got_user_timeline(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::mentions`]
    fn got_mentions(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::retweeted_by_me`]
    fn got_retweeted_by_me(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::retweeted_to_me`]
    fn got_retweeted_to_me(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::retweets_of_me`]
    fn got_retweets_of_me(&self, statuses: Vec<Status>) {}

    // Statuses

    /// Result of [`crate::AsyncClient::show_status`]
    fn got_show_status(&self, status: Status) {}
    /// Result of [`crate::AsyncClient::update_status`]
    fn updated_status(&self, status: Status) {}
    /// Result of [`crate::AsyncClient::destroy_status`]
    fn destroyed_status(&self, status: Status) {}
    /// Result of [`crate::AsyncClient::retweet_status`]
    fn retweeted_status(&self, status: Status) {}
    /// Result of [`crate::AsyncClient::retweets`]
    fn got_retweets(&self, statuses: Vec<Status>) {}

    // Users

    /// Result of [`crate::AsyncClient::show_user`] and
    /// [`crate::AsyncClient::authenticated_user`]
    fn got_user_detail(&self, user: User) {}
    /// Result of [`crate::AsyncClient::friends_statuses`]
    fn got_friends_statuses(&self, page: UserPage) {}
    /// Result of [`crate::AsyncClient::followers_statuses`]
    fn got_followers_statuses(&self, page: UserPage) {}

    // Direct messages

    /// Result of [`crate::AsyncClient::direct_messages`]
    fn got_direct_messages(&self, messages: Vec<DirectMessage>) {}
    /// Result of [`crate::AsyncClient::sent_direct_messages`]
    fn got_sent_direct_messages(&self, messages: Vec<DirectMessage>) {}
    /// Result of [`crate::AsyncClient::send_direct_message`]
    fn sent_direct_message(&self, message: DirectMessage) {}
    /// Result of [`crate::AsyncClient::destroy_direct_message`]
    fn destroyed_direct_message(&self, message: DirectMessage) {}

    // Friendships and social graph

    /// Result of [`crate::AsyncClient::create_friendship`]
    fn created_friendship(&self, user: User) {}
    /// Result of [`crate::AsyncClient::destroy_friendship`]
    fn destroyed_friendship(&self, user: User) {}
    /// Result of [`crate::AsyncClient::exists_friendship`]
    fn got_exists_friendship(&self, exists: bool) {}
    /// Result of [`crate::AsyncClient::friends_ids`]
    fn got_friends_ids(&self, ids: IdList) {}
    /// Result of [`crate::AsyncClient::followers_ids`]
    fn got_followers_ids(&self, ids: IdList) {}

    // Account

    /// Result of [`crate::AsyncClient::rate_limit_status`]
    fn got_rate_limit_status(&self, status: RateLimitStatus) {}
    /// Result of [`crate::AsyncClient::verify_credentials`]
    fn verified_credentials(&self, user: User) {}

    // Favorites

    /// Result of [`crate::AsyncClient::favorites`]
    fn got_favorites(&self, statuses: Vec<Status>) {}
    /// Result of [`crate::AsyncClient::create_favorite`]
    fn created_favorite(&self, status: Status) {}
    /// Result of [`crate::AsyncClient::destroy_favorite`]
    fn destroyed_favorite(&self, status: Status) {}

    // Blocks

    /// Result of [`crate::AsyncClient::create_block`]
    fn created_block(&self, user: User) {}
    /// Result of [`crate::AsyncClient::destroy_block`]
    fn destroyed_block(&self, user: User) {}
    /// Result of [`crate::AsyncClient::exists_block`]
    fn got_exists_block(&self, blocking: bool) {}
    /// Result of [`crate::AsyncClient::blocking_users`]
    fn got_blocking_users(&self, users: Vec<User>) {}

    // Help

    /// Result of [`crate::AsyncClient::test`]
    fn tested(&self, ok: bool) {}

    /// Any operation failed; `method` says which
    fn on_exception(&self, error: ChirpError, method: ApiMethod) {}
}

/// Listener that drops results and only logs failures
///
/// Used when neither the call nor the client supplies one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;

impl ApiListener for NoopListener {
    fn on_exception(&self, error: ChirpError, method: ApiMethod) {
        tracing::debug!(method = %method, error = %error, "Async call failed with no listener");
    }
}
