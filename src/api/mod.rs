//! REST client for the social platform API
//!
//! This module provides a thin client over the platform's REST surface:
//! sessions, relationship feeds, like feeds, and user actions. Transport
//! failures, non-success HTTP statuses, and malformed bodies are reported as
//! distinct error variants so callers can react to each (the cache layer falls
//! back on network errors, sign-in reacts specifically to 404).

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{AccountData, ContentType, IdentityProvider, UserFeedType, UsersPage};

/// Errors that can occur when calling the platform API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connectivity, DNS, TLS)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("request rejected with status {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// Failed to parse the response body
    #[error("failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this error is an HTTP 404 response
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { code: 404 })
    }
}

/// Parameters for creating a session (sign-in)
#[derive(Debug, Clone, Serialize)]
pub struct SessionParams {
    /// Identity provider that issued the access token
    pub identity_provider: IdentityProvider,
    /// Third-party access token
    pub access_token: String,
    /// Installation-specific identifier of this SDK instance
    pub instance_id: String,
    /// Whether to create a user record if none exists for this identity
    pub create_user: bool,
}

/// Successful session creation response
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    /// Handle of the signed-in user
    pub user_handle: String,
    /// Bearer token for subsequent requests
    pub session_token: String,
}

/// Session lifecycle operations
///
/// `ApiClient` implements this against the real platform; tests substitute
/// fakes with scripted responses.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Creates a session for a third-party identity
    async fn post_session(&self, params: &SessionParams) -> Result<SessionCreated, ApiError>;

    /// Deletes the current session
    async fn delete_session(&self) -> Result<(), ApiError>;

    /// Replaces the bearer token attached to subsequent requests
    fn set_session_token(&self, token: Option<String>);
}

/// Relationship actions performed by the signed-in user
#[async_trait]
pub trait UserActions: Send + Sync {
    /// Follows another user
    async fn follow_user(&self, user_handle: &str) -> Result<(), ApiError>;

    /// Unfollows a user
    async fn unfollow_user(&self, user_handle: &str) -> Result<(), ApiError>;

    /// Blocks a user
    async fn block_user(&self, user_handle: &str) -> Result<(), ApiError>;

    /// Unblocks a user
    async fn unblock_user(&self, user_handle: &str) -> Result<(), ApiError>;

    /// Accepts an incoming follow request
    async fn accept_follow_request(&self, user_handle: &str) -> Result<(), ApiError>;

    /// Rejects an incoming follow request
    async fn reject_follow_request(&self, user_handle: &str) -> Result<(), ApiError>;
}

/// Client for the social platform REST API
///
/// Clones share the session token: signing in through one clone makes the
/// token visible to every other clone of the same client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    app_key: String,
    session_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Creates a new client for the given API root and application key
    pub fn new(base_url: impl Into<String>, app_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            app_key: app_key.into(),
            session_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a new client with a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sets an initial session token
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_session_token(Some(token.into()));
        self
    }

    fn current_token(&self) -> Option<String> {
        self.session_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Attaches the application key and bearer token to a request
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("X-Application-Key", &self.app_key);
        match self.current_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Maps non-success statuses to `ApiError::Status`
    fn check_status(response: &reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!(code = status.as_u16(), url = %response.url(), "request rejected");
            Err(ApiError::Status {
                code: status.as_u16(),
            })
        }
    }

    fn feed_url(
        &self,
        subject_handle: &str,
        segment: &str,
        cursor: Option<&str>,
        batch_size: u32,
    ) -> String {
        let mut url = format!(
            "{}/users/{}/{}?batchSize={}",
            self.base_url, subject_handle, segment, batch_size
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(cursor);
        }
        url
    }

    fn like_feed_url(
        &self,
        content_type: ContentType,
        content_handle: &str,
        cursor: Option<&str>,
        batch_size: u32,
    ) -> String {
        let mut url = format!(
            "{}/{}/{}/likes?batchSize={}",
            self.base_url,
            content_type.path_segment(),
            content_handle,
            batch_size
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(cursor);
        }
        url
    }

    /// Fetches one page of a relationship feed for a subject user
    ///
    /// # Arguments
    /// * `feed` - Which relationship feed to read
    /// * `subject_handle` - Handle of the user the feed belongs to (`me` for
    ///   feeds private to the signed-in user)
    /// * `cursor` - Continuation cursor from the previous page, if any
    /// * `batch_size` - Maximum number of users to return
    pub async fn get_user_feed(
        &self,
        feed: UserFeedType,
        subject_handle: &str,
        cursor: Option<&str>,
        batch_size: u32,
    ) -> Result<UsersPage, ApiError> {
        let url = self.feed_url(subject_handle, feed.path_segment(), cursor, batch_size);
        debug!(%url, "fetching user feed");
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::check_status(&response)?;
        let text = response.text().await?;
        parse_users_page(&text)
    }

    /// Fetches one page of the like feed for a piece of content
    pub async fn get_like_feed(
        &self,
        content_type: ContentType,
        content_handle: &str,
        cursor: Option<&str>,
        batch_size: u32,
    ) -> Result<UsersPage, ApiError> {
        let url = self.like_feed_url(content_type, content_handle, cursor, batch_size);
        debug!(%url, "fetching like feed");
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::check_status(&response)?;
        let text = response.text().await?;
        parse_users_page(&text)
    }

    /// Fetches the profile of the signed-in user
    pub async fn get_my_profile(&self) -> Result<AccountData, ApiError> {
        let url = format!("{}/users/me", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::check_status(&response)?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POSTs a `{ "user_handle": ... }` body to a relationship collection
    async fn post_relationship(&self, segment: &str, user_handle: &str) -> Result<(), ApiError> {
        let url = format!("{}/users/me/{}", self.base_url, segment);
        let body = RelationshipBody {
            user_handle: user_handle.to_string(),
        };
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;
        Self::check_status(&response)
    }

    /// DELETEs a member of a relationship collection
    async fn delete_relationship(&self, segment: &str, user_handle: &str) -> Result<(), ApiError> {
        let url = format!("{}/users/me/{}/{}", self.base_url, segment, user_handle);
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check_status(&response)
    }
}

#[async_trait]
impl SessionService for ApiClient {
    async fn post_session(&self, params: &SessionParams) -> Result<SessionCreated, ApiError> {
        let url = format!("{}/sessions", self.base_url);
        debug!(provider = ?params.identity_provider, create_user = params.create_user, "creating session");
        let response = self
            .authorize(self.client.post(&url))
            .json(params)
            .send()
            .await?;
        Self::check_status(&response)?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete_session(&self) -> Result<(), ApiError> {
        let url = format!("{}/sessions/current", self.base_url);
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check_status(&response)
    }

    fn set_session_token(&self, token: Option<String>) {
        *self
            .session_token
            .write()
            .unwrap_or_else(|e| e.into_inner()) = token;
    }
}

#[async_trait]
impl UserActions for ApiClient {
    async fn follow_user(&self, user_handle: &str) -> Result<(), ApiError> {
        self.post_relationship("following", user_handle).await
    }

    async fn unfollow_user(&self, user_handle: &str) -> Result<(), ApiError> {
        self.delete_relationship("following", user_handle).await
    }

    async fn block_user(&self, user_handle: &str) -> Result<(), ApiError> {
        self.post_relationship("blocked_users", user_handle).await
    }

    async fn unblock_user(&self, user_handle: &str) -> Result<(), ApiError> {
        self.delete_relationship("blocked_users", user_handle).await
    }

    async fn accept_follow_request(&self, user_handle: &str) -> Result<(), ApiError> {
        self.post_relationship("followers", user_handle).await
    }

    async fn reject_follow_request(&self, user_handle: &str) -> Result<(), ApiError> {
        self.delete_relationship("pending_users", user_handle).await
    }
}

/// Body for POSTs against relationship collections
#[derive(Debug, Serialize)]
struct RelationshipBody {
    user_handle: String,
}

/// Feed page as returned by the platform
#[derive(Debug, Deserialize)]
struct FeedResponseBody {
    data: Vec<crate::data::UserCompactView>,
    cursor: Option<String>,
}

/// Parses a feed response body into a `UsersPage`
fn parse_users_page(text: &str) -> Result<UsersPage, ApiError> {
    let body: FeedResponseBody = serde_json::from_str(text)?;
    Ok(UsersPage {
        users: body.data,
        cursor: body.cursor,
    })
}
