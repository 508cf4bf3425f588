//! Async Facade
//!
//! [`AsyncClient`] mirrors every [`Client`] operation. Each method validates
//! its arguments, wraps the blocking call in an [`AsyncTask`], queues it on
//! the [`Dispatcher`] and returns at once. The outcome reaches the
//! [`ApiListener`] on a worker thread.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use chirp_core::{ApiListener, AsyncClient, ChirpConfig, Credentials, Paging, Status};
//!
//! struct Printer;
//!
//! impl ApiListener for Printer {
//!     fn got_home_timeline(&self, statuses: Vec<Status>) {
//!         for status in statuses {
//!             println!("{}", status.text);
//!         }
//!     }
//! }
//!
//! let config = ChirpConfig::default().with_credentials(Credentials::new("alice", "secret"));
//! let client = AsyncClient::new(&config)?;
//! client.home_timeline(Paging::new().with_count(20), Some(Arc::new(Printer)))?;
//! # Ok::<(), chirp_core::ChirpError>(())
//! ```
//!
//! # Errors at the call site
//!
//! A facade method only fails synchronously for usage errors: invalid paging
//! or arguments, missing credentials, or a dispatcher that was shut down.
//! Everything else (network, server, decoding) arrives through
//! [`ApiListener::on_exception`].

mod listener;
mod task;

use std::sync::Arc;

pub use listener::{ApiListener, NoopListener};
pub use task::{ApiResponse, AsyncTask};

use crate::api::{ApiMethod, Client, Paging, UserRef};
use crate::config::{ChirpConfig, DispatcherConfig};
use crate::dispatch::Dispatcher;
use crate::error::ChirpError;

/// Per-call listener argument
pub type Listener = Option<Arc<dyn ApiListener>>;

/// Fire-and-forget API client
pub struct AsyncClient {
    client: Arc<Client>,
    dispatcher: Arc<Dispatcher>,
    default_listener: Option<Arc<dyn ApiListener>>,
}

impl AsyncClient {
    /// Create a client and its worker pool from configuration
    ///
    /// # Errors
    ///
    /// [`ChirpError::Transport`] if the HTTP client cannot be built,
    /// [`ChirpError::IllegalState`] if the workers cannot be started.
    pub fn new(config: &ChirpConfig) -> Result<Self, ChirpError> {
        Self::with_client(Client::new(config)?, &config.dispatcher)
    }

    /// Wrap an existing blocking client
    ///
    /// # Errors
    ///
    /// [`ChirpError::IllegalState`] if the workers cannot be started.
    pub fn with_client(client: Client, dispatcher: &DispatcherConfig) -> Result<Self, ChirpError> {
        Ok(Self {
            client: Arc::new(client),
            dispatcher: Arc::new(Dispatcher::from_config(dispatcher)?),
            default_listener: None,
        })
    }

    /// Listener used by calls that pass `None`
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ApiListener>) -> Self {
        self.default_listener = Some(listener);
        self
    }

    /// The underlying blocking client
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The worker pool
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop the worker pool; queued calls are dropped
    ///
    /// # Errors
    ///
    /// [`ChirpError::IllegalState`] on the second call.
    pub fn shutdown(&self) -> Result<(), ChirpError> {
        Ok(self.dispatcher.shutdown()?)
    }

    // =========================================================================
    // Timelines
    // =========================================================================

    /// Async [`Client::public_timeline`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn public_timeline(&self, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::PublicTimeline, listener, |c| {
            c.public_timeline().map(ApiResponse::PublicTimeline)
        })
    }

    /// Async [`Client::home_timeline`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn home_timeline(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::HomeTimeline, listener, move |c| {
            c.home_timeline(paging).map(ApiResponse::HomeTimeline)
        })
    }

    /// Async [`Client::friends_timeline`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn friends_timeline(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::FriendsTimeline, listener, move |c| {
            c.friends_timeline(paging).map(ApiResponse::FriendsTimeline)
        })
    }

    /// Async [`Client::user_timeline`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn user_timeline(
        &self,
        user: Option<UserRef>,
        paging: Paging,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        paging.validate()?;
        self.check_target(ApiMethod::UserTimeline, user.as_ref())?;
        self.submit(ApiMethod::UserTimeline, listener, move |c| {
            c.user_timeline(user.as_ref(), paging)
                .map(ApiResponse::UserTimeline)
        })
    }

    /// Async [`Client::mentions`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn mentions(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::Mentions, listener, move |c| {
            c.mentions(paging).map(ApiResponse::Mentions)
        })
    }

    /// Async [`Client::retweeted_by_me`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn retweeted_by_me(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::RetweetedByMe, listener, move |c| {
            c.retweeted_by_me(paging).map(ApiResponse::RetweetedByMe)
        })
    }

    /// Async [`Client::retweeted_to_me`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn retweeted_to_me(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::RetweetedToMe, listener, move |c| {
            c.retweeted_to_me(paging).map(ApiResponse::RetweetedToMe)
        })
    }

    /// Async [`Client::retweets_of_me`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn retweets_of_me(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::RetweetsOfMe, listener, move |c| {
            c.retweets_of_me(paging).map(ApiResponse::RetweetsOfMe)
        })
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    /// Async [`Client::show_status`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn show_status(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::ShowStatus, listener, move |c| {
            c.show_status(id).map(ApiResponse::ShowStatus)
        })
    }

    /// Async [`Client::update_status`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn update_status(
        &self,
        text: impl Into<String>,
        in_reply_to_status_id: Option<u64>,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChirpError::InvalidArgument(
                "status text must not be empty".to_string(),
            ));
        }
        self.submit(ApiMethod::UpdateStatus, listener, move |c| {
            c.update_status(&text, in_reply_to_status_id)
                .map(ApiResponse::UpdateStatus)
        })
    }

    /// Async [`Client::destroy_status`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn destroy_status(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::DestroyStatus, listener, move |c| {
            c.destroy_status(id).map(ApiResponse::DestroyStatus)
        })
    }

    /// Async [`Client::retweet_status`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn retweet_status(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::RetweetStatus, listener, move |c| {
            c.retweet_status(id).map(ApiResponse::RetweetStatus)
        })
    }

    /// Async [`Client::retweets`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn retweets(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::Retweets, listener, move |c| {
            c.retweets(id).map(ApiResponse::Retweets)
        })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Async [`Client::show_user`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn show_user(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::ShowUser, listener, move |c| {
            c.show_user(&user).map(ApiResponse::ShowUser)
        })
    }

    /// Profile of the configured account, delivered to
    /// [`ApiListener::got_user_detail`]
    ///
    /// # Errors
    ///
    /// [`ChirpError::IllegalState`] when the credentials carry no user id.
    pub fn authenticated_user(&self, listener: Listener) -> Result<(), ChirpError> {
        let user_id = self.client.user_id().ok_or_else(|| {
            ChirpError::IllegalState("no user id configured for the account".to_string())
        })?;
        self.show_user(UserRef::Id(user_id), listener)
    }

    /// Async [`Client::friends_statuses`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn friends_statuses(
        &self,
        user: Option<UserRef>,
        cursor: i64,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        self.check_target(ApiMethod::FriendsStatuses, user.as_ref())?;
        self.submit(ApiMethod::FriendsStatuses, listener, move |c| {
            c.friends_statuses(user.as_ref(), cursor)
                .map(ApiResponse::FriendsStatuses)
        })
    }

    /// Async [`Client::followers_statuses`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn followers_statuses(
        &self,
        user: Option<UserRef>,
        cursor: i64,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        self.check_target(ApiMethod::FollowersStatuses, user.as_ref())?;
        self.submit(ApiMethod::FollowersStatuses, listener, move |c| {
            c.followers_statuses(user.as_ref(), cursor)
                .map(ApiResponse::FollowersStatuses)
        })
    }

    // =========================================================================
    // Direct Messages
    // =========================================================================

    /// Async [`Client::direct_messages`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn direct_messages(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::DirectMessages, listener, move |c| {
            c.direct_messages(paging).map(ApiResponse::DirectMessages)
        })
    }

    /// Async [`Client::sent_direct_messages`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn sent_direct_messages(&self, paging: Paging, listener: Listener) -> Result<(), ChirpError> {
        paging.validate()?;
        self.submit(ApiMethod::SentDirectMessages, listener, move |c| {
            c.sent_direct_messages(paging)
                .map(ApiResponse::SentDirectMessages)
        })
    }

    /// Async [`Client::send_direct_message`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn send_direct_message(
        &self,
        recipient: UserRef,
        text: impl Into<String>,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChirpError::InvalidArgument(
                "message text must not be empty".to_string(),
            ));
        }
        self.submit(ApiMethod::SendDirectMessage, listener, move |c| {
            c.send_direct_message(&recipient, &text)
                .map(ApiResponse::SendDirectMessage)
        })
    }

    /// Async [`Client::destroy_direct_message`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn destroy_direct_message(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::DestroyDirectMessage, listener, move |c| {
            c.destroy_direct_message(id)
                .map(ApiResponse::DestroyDirectMessage)
        })
    }

    // =========================================================================
    // Friendships and Social Graph
    // =========================================================================

    /// Async [`Client::create_friendship`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn create_friendship(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::CreateFriendship, listener, move |c| {
            c.create_friendship(&user).map(ApiResponse::CreateFriendship)
        })
    }

    /// Async [`Client::destroy_friendship`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn destroy_friendship(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::DestroyFriendship, listener, move |c| {
            c.destroy_friendship(&user).map(ApiResponse::DestroyFriendship)
        })
    }

    /// Async [`Client::exists_friendship`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn exists_friendship(
        &self,
        user_a: impl Into<String>,
        user_b: impl Into<String>,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        let (user_a, user_b) = (user_a.into(), user_b.into());
        self.submit(ApiMethod::ExistsFriendship, listener, move |c| {
            c.exists_friendship(&user_a, &user_b)
                .map(ApiResponse::ExistsFriendship)
        })
    }

    /// Async [`Client::friends_ids`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn friends_ids(
        &self,
        user: Option<UserRef>,
        cursor: i64,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        self.check_target(ApiMethod::FriendsIds, user.as_ref())?;
        self.submit(ApiMethod::FriendsIds, listener, move |c| {
            c.friends_ids(user.as_ref(), cursor)
                .map(ApiResponse::FriendsIds)
        })
    }

    /// Async [`Client::followers_ids`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn followers_ids(
        &self,
        user: Option<UserRef>,
        cursor: i64,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        self.check_target(ApiMethod::FollowersIds, user.as_ref())?;
        self.submit(ApiMethod::FollowersIds, listener, move |c| {
            c.followers_ids(user.as_ref(), cursor)
                .map(ApiResponse::FollowersIds)
        })
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Async [`Client::rate_limit_status`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn rate_limit_status(&self, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::RateLimitStatus, listener, |c| {
            c.rate_limit_status().map(ApiResponse::RateLimitStatus)
        })
    }

    /// Async [`Client::verify_credentials`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn verify_credentials(&self, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::VerifyCredentials, listener, |c| {
            c.verify_credentials().map(ApiResponse::VerifyCredentials)
        })
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Async [`Client::favorites`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn favorites(
        &self,
        user: Option<UserRef>,
        page: Option<u32>,
        listener: Listener,
    ) -> Result<(), ChirpError> {
        check_page(page)?;
        self.submit(ApiMethod::Favorites, listener, move |c| {
            c.favorites(user.as_ref(), page).map(ApiResponse::Favorites)
        })
    }

    /// Async [`Client::create_favorite`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn create_favorite(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::CreateFavorite, listener, move |c| {
            c.create_favorite(id).map(ApiResponse::CreateFavorite)
        })
    }

    /// Async [`Client::destroy_favorite`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn destroy_favorite(&self, id: u64, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::DestroyFavorite, listener, move |c| {
            c.destroy_favorite(id).map(ApiResponse::DestroyFavorite)
        })
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Async [`Client::create_block`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn create_block(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::CreateBlock, listener, move |c| {
            c.create_block(&user).map(ApiResponse::CreateBlock)
        })
    }

    /// Async [`Client::destroy_block`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn destroy_block(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::DestroyBlock, listener, move |c| {
            c.destroy_block(&user).map(ApiResponse::DestroyBlock)
        })
    }

    /// Async [`Client::exists_block`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn exists_block(&self, user: UserRef, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::ExistsBlock, listener, move |c| {
            c.exists_block(&user).map(ApiResponse::ExistsBlock)
        })
    }

    /// Async [`Client::blocking_users`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn blocking_users(&self, page: Option<u32>, listener: Listener) -> Result<(), ChirpError> {
        check_page(page)?;
        self.submit(ApiMethod::BlockingUsers, listener, move |c| {
            c.blocking_users(page).map(ApiResponse::BlockingUsers)
        })
    }

    // =========================================================================
    // Help
    // =========================================================================

    /// Async [`Client::test`]
    ///
    /// # Errors
    ///
    /// Usage errors only, see the module docs.
    pub fn test(&self, listener: Listener) -> Result<(), ChirpError> {
        self.submit(ApiMethod::Test, listener, |c| c.test().map(ApiResponse::Test))
    }

    // =========================================================================
    // Submission
    // =========================================================================

    fn submit<F>(&self, method: ApiMethod, listener: Listener, call: F) -> Result<(), ChirpError>
    where
        F: FnOnce(&Client) -> Result<ApiResponse, ChirpError> + Send + 'static,
    {
        if method.requires_authentication() && !self.client.is_authenticated() {
            return Err(ChirpError::MissingCredentials(method.name().to_string()));
        }

        let listener = listener
            .or_else(|| self.default_listener.clone())
            .unwrap_or_else(|| Arc::new(NoopListener));
        let task = AsyncTask::new(method, listener, call);
        let client = Arc::clone(&self.client);

        self.dispatcher.submit(move || task.run(&client))?;
        tracing::trace!(method = %method, pending = self.dispatcher.pending(), "Async call queued");
        Ok(())
    }

    /// Operations that default to the authenticated account need credentials
    /// when no target is named
    fn check_target(&self, method: ApiMethod, user: Option<&UserRef>) -> Result<(), ChirpError> {
        if user.is_none() && !self.client.is_authenticated() {
            return Err(ChirpError::MissingCredentials(method.name().to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AsyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("client", &self.client)
            .field("dispatcher", &self.dispatcher)
            .field("has_default_listener", &self.default_listener.is_some())
            .finish()
    }
}

fn check_page(page: Option<u32>) -> Result<(), ChirpError> {
    if page == Some(0) {
        return Err(ChirpError::InvalidArgument(
            "page must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
    use crate::model::User;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Echo(&'static str);

    impl Transport for Echo {
        fn request(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::from_string(200, self.0))
        }
    }

    struct Forward(parking_lot::Mutex<mpsc::Sender<String>>);

    impl ApiListener for Forward {
        fn got_user_detail(&self, user: User) {
            let _ = self.0.lock().send(format!("user:{}", user.screen_name));
        }
        fn on_exception(&self, error: ChirpError, method: ApiMethod) {
            let _ = self.0.lock().send(format!("error:{method}:{error}"));
        }
    }

    fn async_client(config: &ChirpConfig, body: &'static str) -> AsyncClient {
        let client = Client::with_transport(config, Arc::new(Echo(body)));
        AsyncClient::with_client(client, &config.dispatcher).unwrap()
    }

    #[test]
    fn test_usage_errors_are_synchronous() {
        let client = async_client(&ChirpConfig::default(), "[]");

        assert!(matches!(
            client.home_timeline(Paging::new(), None),
            Err(ChirpError::MissingCredentials(_))
        ));
        assert!(matches!(
            client.user_timeline(None, Paging::new(), None),
            Err(ChirpError::MissingCredentials(_))
        ));
        assert!(matches!(
            client.blocking_users(Some(0), None),
            Err(ChirpError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.authenticated_user(None),
            Err(ChirpError::IllegalState(_))
        ));
        assert!(client.public_timeline(None).is_ok());
        assert!(client.user_timeline(Some("alice".into()), Paging::new(), None).is_ok());
    }

    #[test]
    fn test_invalid_paging_rejected_before_queueing() {
        let config = ChirpConfig::default().with_credentials(Credentials::new("alice", "pw"));
        let client = async_client(&config, "[]");
        assert!(matches!(
            client.home_timeline(Paging::new().with_page(0), None),
            Err(ChirpError::InvalidArgument(_))
        ));
        assert_eq!(client.dispatcher().pending(), 0);
    }

    #[test]
    fn test_default_listener_is_used() {
        let mut credentials = Credentials::new("alice", "pw");
        credentials.user_id = Some(7);
        let config = ChirpConfig::default().with_credentials(credentials);
        let (tx, rx) = mpsc::channel();
        let client = async_client(&config, r#"{"id": 7, "screen_name": "alice"}"#)
            .with_listener(Arc::new(Forward(parking_lot::Mutex::new(tx))));

        client.authenticated_user(None).unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            "user:alice"
        );
    }

    #[test]
    fn test_shutdown_twice_is_illegal_state() {
        let client = async_client(&ChirpConfig::default(), "[]");
        client.shutdown().unwrap();
        assert!(matches!(client.shutdown(), Err(ChirpError::IllegalState(_))));
        assert!(matches!(
            client.public_timeline(None),
            Err(ChirpError::IllegalState(_))
        ));
    }
}
