//! Async task
//!
//! An [`AsyncTask`] pairs one captured blocking call with the listener that
//! should hear about it. A single generic task type serves every operation:
//! the call closure returns an [`ApiResponse`], and
//! [`ApiResponse::deliver`] is the one table that maps each outcome to its
//! listener callback.

use std::sync::Arc;

use super::ApiListener;
use crate::api::{ApiMethod, Client};
use crate::error::ChirpError;
use crate::model::{DirectMessage, IdList, RateLimitStatus, Status, User, UserPage};

/// Successful outcome of one operation
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum ApiResponse {
    PublicTimeline(Vec<Status>),
    HomeTimeline(Vec<Status>),
    FriendsTimeline(Vec<Status>),
    UserTimeline(Vec<Status>),
    Mentions(Vec<Status>),
    RetweetedByMe(Vec<Status>),
    RetweetedToMe(Vec<Status>),
    RetweetsOfMe(Vec<Status>),
    ShowStatus(Status),
    UpdateStatus(Status),
    DestroyStatus(Status),
    RetweetStatus(Status),
    Retweets(Vec<Status>),
    ShowUser(User),
    FriendsStatuses(UserPage),
    FollowersStatuses(UserPage),
    DirectMessages(Vec<DirectMessage>),
    SentDirectMessages(Vec<DirectMessage>),
    SendDirectMessage(DirectMessage),
    DestroyDirectMessage(DirectMessage),
    CreateFriendship(User),
    DestroyFriendship(User),
    ExistsFriendship(bool),
    FriendsIds(IdList),
    FollowersIds(IdList),
    RateLimitStatus(RateLimitStatus),
    VerifyCredentials(User),
    Favorites(Vec<Status>),
    CreateFavorite(Status),
    DestroyFavorite(Status),
    CreateBlock(User),
    DestroyBlock(User),
    ExistsBlock(bool),
    BlockingUsers(Vec<User>),
    Test(bool),
}

impl ApiResponse {
    /// Operation that produces this outcome
    #[must_use]
    pub fn method(&self) -> ApiMethod {
        match self {
            Self::PublicTimeline(_) => ApiMethod::PublicTimeline,
            Self::HomeTimeline(_) => ApiMethod::HomeTimeline,
            Self::FriendsTimeline(_) => ApiMethod::FriendsTimeline,
            Self::UserTimeline(_) => ApiMethod::UserTimeline,
            Self::Mentions(_) => ApiMethod::Mentions,
            Self::RetweetedByMe(_) => ApiMethod::RetweetedByMe,
            Self::RetweetedToMe(_) => ApiMethod::RetweetedToMe,
            Self::RetweetsOfMe(_) => ApiMethod::RetweetsOfMe,
            Self::ShowStatus(_) => ApiMethod::ShowStatus,
            Self::UpdateStatus(_) => ApiMethod::UpdateStatus,
            Self::DestroyStatus(_) => ApiMethod::DestroyStatus,
            Self::RetweetStatus(_) => ApiMethod::RetweetStatus,
            Self::Retweets(_) => ApiMethod::Retweets,
            Self::ShowUser(_) => ApiMethod::ShowUser,
            Self::FriendsStatuses(_) => ApiMethod::FriendsStatuses,
            Self::FollowersStatuses(_) => ApiMethod::FollowersStatuses,
            Self::DirectMessages(_) => ApiMethod::DirectMessages,
            Self::SentDirectMessages(_) => ApiMethod::SentDirectMessages,
            Self::SendDirectMessage(_) => ApiMethod::SendDirectMessage,
            Self::DestroyDirectMessage(_) => ApiMethod::DestroyDirectMessage,
            Self::CreateFriendship(_) => ApiMethod::CreateFriendship,
            Self::DestroyFriendship(_) => ApiMethod::DestroyFriendship,
            Self::ExistsFriendship(_) => ApiMethod::ExistsFriendship,
            Self::FriendsIds(_) => ApiMethod::FriendsIds,
            Self::FollowersIds(_) => ApiMethod::FollowersIds,
            Self::RateLimitStatus(_) => ApiMethod::RateLimitStatus,
            Self::VerifyCredentials(_) => ApiMethod::VerifyCredentials,
            Self::Favorites(_) => ApiMethod::Favorites,
            Self::CreateFavorite(_) => ApiMethod::CreateFavorite,
            Self::DestroyFavorite(_) => ApiMethod::DestroyFavorite,
            Self::CreateBlock(_) => ApiMethod::CreateBlock,
            Self::DestroyBlock(_) => ApiMethod::DestroyBlock,
            Self::ExistsBlock(_) => ApiMethod::ExistsBlock,
            Self::BlockingUsers(_) => ApiMethod::BlockingUsers,
            Self::Test(_) => ApiMethod::Test,
        }
    }

    /// Hand the payload to the matching listener callback
    pub fn deliver(self, listener: &dyn ApiListener) {
        match self {
            Self::PublicTimeline(v) => listener.got_public_timeline(v),
            Self::HomeTimeline(v) => listener.got_home_timeline(v),
            Self::FriendsTimeline(v) => listener.got_friends_timeline(v),
            Self::UserTimeline(v) => listener.got_user_timeline(v),
            Self::Mentions(v) => listener.got_mentions(v),
            Self::RetweetedByMe(v) => listener.got_retweeted_by_me(v),
            Self::RetweetedToMe(v) => listener.got_retweeted_to_me(v),
            Self::RetweetsOfMe(v) => listener.got_retweets_of_me(v),
            Self::ShowStatus(v) => listener.got_show_status(v),
            Self::UpdateStatus(v) => listener.updated_status(v),
            Self::DestroyStatus(v) => listener.destroyed_status(v),
            Self::RetweetStatus(v) => listener.retweeted_status(v),
            Self::Retweets(v) => listener.got_retweets(v),
            Self::ShowUser(v) => listener.got_user_detail(v),
            Self::FriendsStatuses(v) => listener.got_friends_statuses(v),
            Self::FollowersStatuses(v) => listener.got_followers_statuses(v),
            Self::DirectMessages(v) => listener.got_direct_messages(v),
            Self::SentDirectMessages(v) => listener.got_sent_direct_messages(v),
            Self::SendDirectMessage(v) => listener.sent_direct_message(v),
            Self::DestroyDirectMessage(v) => listener.destroyed_direct_message(v),
            Self::CreateFriendship(v) => listener.created_friendship(v),
            Self::DestroyFriendship(v) => listener.destroyed_friendship(v),
            Self::ExistsFriendship(v) => listener.got_exists_friendship(v),
            Self::FriendsIds(v) => listener.got_friends_ids(v),
            Self::FollowersIds(v) => listener.got_followers_ids(v),
            Self::RateLimitStatus(v) => listener.got_rate_limit_status(v),
            Self::VerifyCredentials(v) => listener.verified_credentials(v),
            Self::Favorites(v) => listener.got_favorites(v),
            Self::CreateFavorite(v) => listener.created_favorite(v),
            Self::DestroyFavorite(v) => listener.destroyed_favorite(v),
            Self::CreateBlock(v) => listener.created_block(v),
            Self::DestroyBlock(v) => listener.destroyed_block(v),
            Self::ExistsBlock(v) => listener.got_exists_block(v),
            Self::BlockingUsers(v) => listener.got_blocking_users(v),
            Self::Test(v) => listener.tested(v),
        }
    }
}

type Call = Box<dyn FnOnce(&Client) -> Result<ApiResponse, ChirpError> + Send>;

/// One queued API call and its listener
pub struct AsyncTask {
    method: ApiMethod,
    call: Call,
    listener: Arc<dyn ApiListener>,
}

impl AsyncTask {
    /// Capture a call; nothing runs until [`AsyncTask::run`]
    pub fn new<F>(method: ApiMethod, listener: Arc<dyn ApiListener>, call: F) -> Self
    where
        F: FnOnce(&Client) -> Result<ApiResponse, ChirpError> + Send + 'static,
    {
        Self {
            method,
            call: Box::new(call),
            listener,
        }
    }

    /// Operation this task performs
    #[must_use]
    pub fn method(&self) -> ApiMethod {
        self.method
    }

    /// Perform the call and notify the listener exactly once
    ///
    /// Success goes to the operation's own callback, failure to
    /// [`ApiListener::on_exception`]. A panic in the call or in a callback
    /// propagates to the caller (the dispatcher worker catches it).
    pub fn run(self, client: &Client) {
        let Self {
            method,
            call,
            listener,
        } = self;

        match call(client) {
            Ok(response) => {
                debug_assert_eq!(response.method(), method);
                tracing::debug!(method = %method, "Async call succeeded");
                response.deliver(listener.as_ref());
            }
            Err(error) => {
                tracing::debug!(method = %method, error = %error, "Async call failed");
                listener.on_exception(error, method);
            }
        }
    }
}

impl std::fmt::Debug for AsyncTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTask")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChirpConfig;
    use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
    use parking_lot::Mutex;

    struct Unreachable;

    impl Transport for Unreachable {
        fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connect {
                url: request.url.clone(),
                reason: "unreachable".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ApiListener for Recorder {
        fn got_home_timeline(&self, statuses: Vec<Status>) {
            self.0.lock().push(format!("home:{}", statuses.len()));
        }
        fn tested(&self, ok: bool) {
            self.0.lock().push(format!("tested:{ok}"));
        }
        fn on_exception(&self, _error: ChirpError, method: ApiMethod) {
            self.0.lock().push(format!("error:{method}"));
        }
    }

    fn client() -> Client {
        Client::with_transport(&ChirpConfig::default(), Arc::new(Unreachable))
    }

    #[test]
    fn test_response_methods_cover_every_operation() {
        let responses = [
            ApiResponse::PublicTimeline(Vec::new()),
            ApiResponse::ShowStatus(Status::default()),
            ApiResponse::ExistsBlock(false),
            ApiResponse::Test(true),
        ];
        let methods: Vec<_> = responses.iter().map(ApiResponse::method).collect();
        assert_eq!(
            methods,
            [
                ApiMethod::PublicTimeline,
                ApiMethod::ShowStatus,
                ApiMethod::ExistsBlock,
                ApiMethod::Test
            ]
        );
    }

    #[test]
    fn test_success_goes_to_matching_callback() {
        let recorder = Arc::new(Recorder::default());
        let task = AsyncTask::new(ApiMethod::HomeTimeline, recorder.clone(), |_| {
            Ok(ApiResponse::HomeTimeline(vec![Status::default(), Status::default()]))
        });
        assert_eq!(task.method(), ApiMethod::HomeTimeline);

        task.run(&client());
        assert_eq!(*recorder.0.lock(), vec!["home:2".to_string()]);
    }

    #[test]
    fn test_failure_goes_to_on_exception_with_method() {
        let recorder = Arc::new(Recorder::default());
        let task = AsyncTask::new(ApiMethod::Test, recorder.clone(), |client| {
            client.test().map(ApiResponse::Test)
        });

        task.run(&client());
        assert_eq!(*recorder.0.lock(), vec!["error:TEST".to_string()]);
    }

    #[test]
    fn test_unhandled_callbacks_default_to_noop() {
        let recorder = Arc::new(Recorder::default());
        ApiResponse::VerifyCredentials(User::default()).deliver(recorder.as_ref());
        assert!(recorder.0.lock().is_empty());
    }
}
