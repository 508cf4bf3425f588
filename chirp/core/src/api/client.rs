//! Synchronous API client
//!
//! Every operation builds one [`HttpRequest`], runs it through the
//! [`Transport`], forwards rate-limit headers, maps non-2xx answers to
//! [`ChirpError::Api`] and decodes the body. The async facade runs these same
//! methods on dispatcher threads.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::{ApiMethod, Paging, RateLimitListeners, RateLimitScope, UserRef};
use crate::config::{ApiConfig, ChirpConfig, Credentials};
use crate::error::ChirpError;
use crate::http::{HttpRequest, Method, Parameter, ReqwestTransport, Transport};
use crate::model::{
    decode_body, DirectMessage, IdList, RateLimitStatus, Status, User, UserPage,
};

/// Longest error body echoed back in [`ChirpError::Api`]
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Blocking client for the REST API
///
/// Cheap to clone; clones share the transport and rate-limit listeners.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    api: ApiConfig,
    credentials: Option<Credentials>,
    rate_limits: RateLimitListeners,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api", &self.api)
            .field("credentials", &self.credentials)
            .field("rate_limits", &self.rate_limits)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client on a `reqwest` transport
    ///
    /// # Errors
    ///
    /// Returns [`ChirpError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ChirpConfig) -> Result<Self, ChirpError> {
        let transport =
            ReqwestTransport::new(&config.http)?.with_source(config.api.source.clone());
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client on any transport
    #[must_use]
    pub fn with_transport(config: &ChirpConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api: config.api.clone(),
            credentials: config.credentials.clone(),
            rate_limits: RateLimitListeners::new(),
        }
    }

    /// Whether requests carry credentials
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Configured account id, if known
    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        self.credentials.as_ref().and_then(|c| c.user_id)
    }

    /// Endpoint settings
    #[must_use]
    pub fn api_config(&self) -> &ApiConfig {
        &self.api
    }

    /// Rate-limit listener registry
    #[must_use]
    pub fn rate_limit_listeners(&self) -> &RateLimitListeners {
        &self.rate_limits
    }

    // =========================================================================
    // Timelines
    // =========================================================================

    /// The 20 most recent public statuses
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn public_timeline(&self) -> Result<Vec<Status>, ChirpError> {
        self.get(ApiMethod::PublicTimeline, "statuses/public_timeline.json", Vec::new())
    }

    /// Statuses of the account and the accounts it follows, including retweets
    ///
    /// # Errors
    ///
    /// [`ChirpError::MissingCredentials`] without credentials, otherwise any
    /// error from the call.
    pub fn home_timeline(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::HomeTimeline, "statuses/home_timeline.json", paging)
    }

    /// Statuses of the account and the accounts it follows
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn friends_timeline(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::FriendsTimeline, "statuses/friends_timeline.json", paging)
    }

    /// Statuses posted by one account (the authenticated one when `user` is `None`)
    ///
    /// # Errors
    ///
    /// [`ChirpError::MissingCredentials`] when `user` is `None` and there are
    /// no credentials, otherwise any error from the call.
    pub fn user_timeline(
        &self,
        user: Option<&UserRef>,
        paging: Paging,
    ) -> Result<Vec<Status>, ChirpError> {
        paging.validate()?;
        let mut parameters = self.target(ApiMethod::UserTimeline, user)?;
        parameters.extend(paging.to_parameters());
        self.get(ApiMethod::UserTimeline, "statuses/user_timeline.json", parameters)
    }

    /// Statuses mentioning the account
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn mentions(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::Mentions, "statuses/mentions.json", paging)
    }

    /// Retweets posted by the account
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn retweeted_by_me(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::RetweetedByMe, "statuses/retweeted_by_me.json", paging)
    }

    /// Retweets posted by accounts the account follows
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn retweeted_to_me(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::RetweetedToMe, "statuses/retweeted_to_me.json", paging)
    }

    /// The account's statuses that others retweeted
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn retweets_of_me(&self, paging: Paging) -> Result<Vec<Status>, ChirpError> {
        self.paged(ApiMethod::RetweetsOfMe, "statuses/retweets_of_me.json", paging)
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    /// One status by id
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn show_status(&self, id: u64) -> Result<Status, ChirpError> {
        self.get(ApiMethod::ShowStatus, &format!("statuses/show/{id}.json"), Vec::new())
    }

    /// Post a status, optionally as a reply
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for empty text, otherwise any error
    /// from the call.
    pub fn update_status(
        &self,
        text: &str,
        in_reply_to_status_id: Option<u64>,
    ) -> Result<Status, ChirpError> {
        if text.trim().is_empty() {
            return Err(ChirpError::InvalidArgument(
                "status text must not be empty".to_string(),
            ));
        }
        let mut parameters = vec![
            Parameter::new("status", text),
            Parameter::new("source", &self.api.source),
        ];
        if let Some(id) = in_reply_to_status_id {
            parameters.push(Parameter::new("in_reply_to_status_id", id));
        }
        self.post(ApiMethod::UpdateStatus, "statuses/update.json", parameters)
    }

    /// Delete one of the account's statuses
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn destroy_status(&self, id: u64) -> Result<Status, ChirpError> {
        self.post(ApiMethod::DestroyStatus, &format!("statuses/destroy/{id}.json"), Vec::new())
    }

    /// Retweet a status
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn retweet_status(&self, id: u64) -> Result<Status, ChirpError> {
        self.post(ApiMethod::RetweetStatus, &format!("statuses/retweet/{id}.json"), Vec::new())
    }

    /// Up to 100 retweets of a status
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn retweets(&self, id: u64) -> Result<Vec<Status>, ChirpError> {
        self.get(ApiMethod::Retweets, &format!("statuses/retweets/{id}.json"), Vec::new())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// One account's profile
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn show_user(&self, user: &UserRef) -> Result<User, ChirpError> {
        self.get(ApiMethod::ShowUser, "users/show.json", vec![user.to_parameter()])
    }

    /// Accounts followed by `user`, with their latest status
    ///
    /// # Errors
    ///
    /// Same as [`Client::user_timeline`].
    pub fn friends_statuses(
        &self,
        user: Option<&UserRef>,
        cursor: i64,
    ) -> Result<UserPage, ChirpError> {
        let mut parameters = self.target(ApiMethod::FriendsStatuses, user)?;
        parameters.push(Parameter::new("cursor", cursor));
        self.get(ApiMethod::FriendsStatuses, "statuses/friends.json", parameters)
    }

    /// Followers of `user`, with their latest status
    ///
    /// # Errors
    ///
    /// Same as [`Client::user_timeline`].
    pub fn followers_statuses(
        &self,
        user: Option<&UserRef>,
        cursor: i64,
    ) -> Result<UserPage, ChirpError> {
        let mut parameters = self.target(ApiMethod::FollowersStatuses, user)?;
        parameters.push(Parameter::new("cursor", cursor));
        self.get(ApiMethod::FollowersStatuses, "statuses/followers.json", parameters)
    }

    // =========================================================================
    // Direct Messages
    // =========================================================================

    /// Messages received by the account
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn direct_messages(&self, paging: Paging) -> Result<Vec<DirectMessage>, ChirpError> {
        self.paged(ApiMethod::DirectMessages, "direct_messages.json", paging)
    }

    /// Messages sent by the account
    ///
    /// # Errors
    ///
    /// Same as [`Client::home_timeline`].
    pub fn sent_direct_messages(&self, paging: Paging) -> Result<Vec<DirectMessage>, ChirpError> {
        self.paged(ApiMethod::SentDirectMessages, "direct_messages/sent.json", paging)
    }

    /// Send a message to a follower
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for empty text, otherwise any error
    /// from the call.
    pub fn send_direct_message(
        &self,
        recipient: &UserRef,
        text: &str,
    ) -> Result<DirectMessage, ChirpError> {
        if text.trim().is_empty() {
            return Err(ChirpError::InvalidArgument(
                "message text must not be empty".to_string(),
            ));
        }
        self.post(
            ApiMethod::SendDirectMessage,
            "direct_messages/new.json",
            vec![recipient.to_parameter(), Parameter::new("text", text)],
        )
    }

    /// Delete a received message
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn destroy_direct_message(&self, id: u64) -> Result<DirectMessage, ChirpError> {
        self.post(
            ApiMethod::DestroyDirectMessage,
            &format!("direct_messages/destroy/{id}.json"),
            Vec::new(),
        )
    }

    // =========================================================================
    // Friendships and Social Graph
    // =========================================================================

    /// Follow an account
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn create_friendship(&self, user: &UserRef) -> Result<User, ChirpError> {
        self.post(ApiMethod::CreateFriendship, "friendships/create.json", vec![user.to_parameter()])
    }

    /// Unfollow an account
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn destroy_friendship(&self, user: &UserRef) -> Result<User, ChirpError> {
        self.post(ApiMethod::DestroyFriendship, "friendships/destroy.json", vec![user.to_parameter()])
    }

    /// Whether `user_a` follows `user_b`
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn exists_friendship(&self, user_a: &str, user_b: &str) -> Result<bool, ChirpError> {
        self.get(
            ApiMethod::ExistsFriendship,
            "friendships/exists.json",
            vec![Parameter::new("user_a", user_a), Parameter::new("user_b", user_b)],
        )
    }

    /// Ids of the accounts `user` follows
    ///
    /// # Errors
    ///
    /// Same as [`Client::user_timeline`].
    pub fn friends_ids(&self, user: Option<&UserRef>, cursor: i64) -> Result<IdList, ChirpError> {
        let mut parameters = self.target(ApiMethod::FriendsIds, user)?;
        parameters.push(Parameter::new("cursor", cursor));
        self.get(ApiMethod::FriendsIds, "friends/ids.json", parameters)
    }

    /// Ids of the accounts following `user`
    ///
    /// # Errors
    ///
    /// Same as [`Client::user_timeline`].
    pub fn followers_ids(&self, user: Option<&UserRef>, cursor: i64) -> Result<IdList, ChirpError> {
        let mut parameters = self.target(ApiMethod::FollowersIds, user)?;
        parameters.push(Parameter::new("cursor", cursor));
        self.get(ApiMethod::FollowersIds, "followers/ids.json", parameters)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Remaining allowance of the account (or of the IP when anonymous)
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn rate_limit_status(&self) -> Result<RateLimitStatus, ChirpError> {
        self.get(ApiMethod::RateLimitStatus, "account/rate_limit_status.json", Vec::new())
    }

    /// Check the credentials and return the account
    ///
    /// # Errors
    ///
    /// [`ChirpError::Api`] with status 401 when the credentials are wrong.
    pub fn verify_credentials(&self) -> Result<User, ChirpError> {
        self.get(ApiMethod::VerifyCredentials, "account/verify_credentials.json", Vec::new())
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Favorite statuses of `user` (the account when `None`)
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for page 0, otherwise any error from
    /// the call.
    pub fn favorites(&self, user: Option<&UserRef>, page: Option<u32>) -> Result<Vec<Status>, ChirpError> {
        let mut parameters = user.map(UserRef::to_id_parameter).into_iter().collect::<Vec<_>>();
        parameters.extend(page_parameter(page)?);
        self.get(ApiMethod::Favorites, "favorites.json", parameters)
    }

    /// Mark a status as favorite
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn create_favorite(&self, id: u64) -> Result<Status, ChirpError> {
        self.post(ApiMethod::CreateFavorite, &format!("favorites/create/{id}.json"), Vec::new())
    }

    /// Remove a favorite mark
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn destroy_favorite(&self, id: u64) -> Result<Status, ChirpError> {
        self.post(ApiMethod::DestroyFavorite, &format!("favorites/destroy/{id}.json"), Vec::new())
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Block an account
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn create_block(&self, user: &UserRef) -> Result<User, ChirpError> {
        self.post(ApiMethod::CreateBlock, "blocks/create.json", vec![user.to_parameter()])
    }

    /// Unblock an account
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn destroy_block(&self, user: &UserRef) -> Result<User, ChirpError> {
        self.post(ApiMethod::DestroyBlock, "blocks/destroy.json", vec![user.to_parameter()])
    }

    /// Whether the account blocks `user`
    ///
    /// The server answers 404 for "not blocked"; that maps to `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Any other [`ChirpError`] from the call.
    pub fn exists_block(&self, user: &UserRef) -> Result<bool, ChirpError> {
        match self.get::<User>(ApiMethod::ExistsBlock, "blocks/exists.json", vec![user.to_parameter()]) {
            Ok(_) => Ok(true),
            Err(ChirpError::Api { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Accounts blocked by the account
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] for page 0, otherwise any error from
    /// the call.
    pub fn blocking_users(&self, page: Option<u32>) -> Result<Vec<User>, ChirpError> {
        let parameters = page_parameter(page)?.into_iter().collect();
        self.get(ApiMethod::BlockingUsers, "blocks/blocking.json", parameters)
    }

    // =========================================================================
    // Help
    // =========================================================================

    /// Ping the API
    ///
    /// # Errors
    ///
    /// Any [`ChirpError`] from the call.
    pub fn test(&self) -> Result<bool, ChirpError> {
        let body = self.call(ApiMethod::Test, Method::Get, "help/test.json", Vec::new())?;
        Ok(body.contains("ok"))
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    fn paged<T: DeserializeOwned>(
        &self,
        method: ApiMethod,
        path: &str,
        paging: Paging,
    ) -> Result<T, ChirpError> {
        paging.validate()?;
        self.get(method, path, paging.to_parameters())
    }

    /// Parameters naming the target account, or a credentials check when none
    fn target(&self, method: ApiMethod, user: Option<&UserRef>) -> Result<Vec<Parameter>, ChirpError> {
        match user {
            Some(user) => Ok(vec![user.to_parameter()]),
            None => {
                self.require_credentials(method)?;
                Ok(Vec::new())
            }
        }
    }

    fn require_credentials(&self, method: ApiMethod) -> Result<(), ChirpError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ChirpError::MissingCredentials(method.name().to_string()))
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        method: ApiMethod,
        path: &str,
        parameters: Vec<Parameter>,
    ) -> Result<T, ChirpError> {
        let body = self.call(method, Method::Get, path, parameters)?;
        Ok(decode_body(&body)?)
    }

    fn post<T: DeserializeOwned>(
        &self,
        method: ApiMethod,
        path: &str,
        parameters: Vec<Parameter>,
    ) -> Result<T, ChirpError> {
        let body = self.call(method, Method::Post, path, parameters)?;
        Ok(decode_body(&body)?)
    }

    fn call(
        &self,
        method: ApiMethod,
        http_method: Method,
        path: &str,
        parameters: Vec<Parameter>,
    ) -> Result<String, ChirpError> {
        if method.requires_authentication() {
            self.require_credentials(method)?;
        }

        let authorization = self
            .credentials
            .as_ref()
            .map(Credentials::authorization)
            .unwrap_or_default();
        let authenticated = authorization.is_enabled();
        let request = HttpRequest::new(http_method, format!("{}{path}", self.api.rest_base_url))
            .with_parameters(parameters)
            .with_authorization(authorization);

        let response = self.transport.request(&request)?;
        self.rate_limits
            .notify(response.headers(), RateLimitScope::for_request(authenticated));

        let status = response.status();
        let success = response.is_success();
        let body = response.text()?;
        tracing::debug!(method = %method, status, "API call completed");

        if success {
            Ok(body)
        } else {
            Err(ChirpError::Api {
                status,
                message: error_message(&body),
            })
        }
    }
}

fn page_parameter(page: Option<u32>) -> Result<Option<Parameter>, ChirpError> {
    match page {
        Some(0) => Err(ChirpError::InvalidArgument(
            "page must be at least 1".to_string(),
        )),
        Some(page) => Ok(Some(Parameter::new("page", page))),
        None => Ok(None),
    }
}

/// Server error text from a `{"error": "..."}` body, else the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error() {
        assert_eq!(
            error_message(r#"{"request": "/1/x.json", "error": "Not found"}"#),
            "Not found"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(&"x".repeat(500)).len(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_page_parameter() {
        assert!(page_parameter(None).unwrap().is_none());
        assert_eq!(page_parameter(Some(3)).unwrap().unwrap().value, "3");
        assert!(page_parameter(Some(0)).is_err());
    }
}
