//! Relationship and like feed queries
//!
//! `FeedClient` composes the REST client with the cache store through
//! [`CachedQuery`]: every feed type gets its own cached query with a
//! key-derivation tied to the subject handle, so entries for different
//! (feed type, subject) pairs never interfere.

use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};
use crate::cache::{CacheError, CacheStore, CachedQuery, NetworkMethod, QueryError};
use crate::data::{ContentType, UserFeedType, UsersPage};

/// Default number of users requested per page
pub const DEFAULT_BATCH_SIZE: u32 = 20;

/// A query for one page of a user feed
///
/// Immutable value; the subject handle identifies the cache key together
/// with the feed type, while cursor and batch size only shape the network
/// call.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    /// Handle of the user (or content) the feed belongs to
    pub subject_handle: String,
    /// Continuation cursor from the previous page, if any
    pub cursor: Option<String>,
    /// Maximum number of users to return
    pub batch_size: u32,
}

impl FeedRequest {
    /// Creates a request for the first page of a subject's feed
    pub fn new(subject_handle: impl Into<String>) -> Self {
        Self {
            subject_handle: subject_handle.into(),
            cursor: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Continues from a cursor returned by a previous page
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Overrides the page size
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Network method for one relationship feed type
struct UserFeedMethod {
    api: ApiClient,
    feed: UserFeedType,
}

#[async_trait]
impl NetworkMethod<FeedRequest, UsersPage> for UserFeedMethod {
    async fn call(&self, request: &FeedRequest) -> Result<UsersPage, ApiError> {
        self.api
            .get_user_feed(
                self.feed,
                &request.subject_handle,
                request.cursor.as_deref(),
                request.batch_size,
            )
            .await
    }
}

/// Network method for one like feed content type
struct LikeFeedMethod {
    api: ApiClient,
    content_type: ContentType,
}

#[async_trait]
impl NetworkMethod<FeedRequest, UsersPage> for LikeFeedMethod {
    async fn call(&self, request: &FeedRequest) -> Result<UsersPage, ApiError> {
        self.api
            .get_like_feed(
                self.content_type,
                &request.subject_handle,
                request.cursor.as_deref(),
                request.batch_size,
            )
            .await
    }
}

/// Cache-backed access to relationship and like feeds
pub struct FeedClient {
    followers: CachedQuery<FeedRequest, UsersPage>,
    following: CachedQuery<FeedRequest, UsersPage>,
    blocked: CachedQuery<FeedRequest, UsersPage>,
    pending_requests: CachedQuery<FeedRequest, UsersPage>,
    topic_likes: CachedQuery<FeedRequest, UsersPage>,
    comment_likes: CachedQuery<FeedRequest, UsersPage>,
    reply_likes: CachedQuery<FeedRequest, UsersPage>,
}

fn user_feed_query(
    api: &ApiClient,
    store: &CacheStore,
    feed: UserFeedType,
) -> CachedQuery<FeedRequest, UsersPage> {
    CachedQuery::new(
        Box::new(UserFeedMethod {
            api: api.clone(),
            feed,
        }),
        store.clone(),
        move |request: &FeedRequest| feed.cache_key(&request.subject_handle),
    )
}

fn like_feed_query(
    api: &ApiClient,
    store: &CacheStore,
    content_type: ContentType,
) -> CachedQuery<FeedRequest, UsersPage> {
    CachedQuery::new(
        Box::new(LikeFeedMethod {
            api: api.clone(),
            content_type,
        }),
        store.clone(),
        move |request: &FeedRequest| {
            format!("{}_{}", content_type.key_prefix(), request.subject_handle)
        },
    )
}

impl FeedClient {
    /// Creates a feed client over an API client and a shared cache store
    pub fn new(api: ApiClient, store: CacheStore) -> Self {
        Self {
            followers: user_feed_query(&api, &store, UserFeedType::Followers),
            following: user_feed_query(&api, &store, UserFeedType::Following),
            blocked: user_feed_query(&api, &store, UserFeedType::Blocked),
            pending_requests: user_feed_query(&api, &store, UserFeedType::PendingRequests),
            topic_likes: like_feed_query(&api, &store, ContentType::Topic),
            comment_likes: like_feed_query(&api, &store, ContentType::Comment),
            reply_likes: like_feed_query(&api, &store, ContentType::Reply),
        }
    }

    fn user_query(&self, feed: UserFeedType) -> &CachedQuery<FeedRequest, UsersPage> {
        match feed {
            UserFeedType::Followers => &self.followers,
            UserFeedType::Following => &self.following,
            UserFeedType::Blocked => &self.blocked,
            UserFeedType::PendingRequests => &self.pending_requests,
        }
    }

    fn like_query(&self, content_type: ContentType) -> &CachedQuery<FeedRequest, UsersPage> {
        match content_type {
            ContentType::Topic => &self.topic_likes,
            ContentType::Comment => &self.comment_likes,
            ContentType::Reply => &self.reply_likes,
        }
    }

    /// Fetches one page of a relationship feed, preferring fresh data
    ///
    /// Falls back to the cached page when the network fails; see
    /// [`CachedQuery::execute`] for the exact contract.
    pub async fn user_feed(
        &self,
        feed: UserFeedType,
        request: &FeedRequest,
    ) -> Result<UsersPage, QueryError> {
        self.user_query(feed).execute(request).await
    }

    /// Reads the cached page of a relationship feed without touching the network
    pub fn cached_user_feed(
        &self,
        feed: UserFeedType,
        request: &FeedRequest,
    ) -> Result<Option<UsersPage>, CacheError> {
        self.user_query(feed).cached_response(request)
    }

    /// Fetches one page of a like feed, preferring fresh data
    pub async fn like_feed(
        &self,
        content_type: ContentType,
        request: &FeedRequest,
    ) -> Result<UsersPage, QueryError> {
        self.like_query(content_type).execute(request).await
    }

    /// Reads the cached page of a like feed without touching the network
    pub fn cached_like_feed(
        &self,
        content_type: ContentType,
        request: &FeedRequest,
    ) -> Result<Option<UsersPage>, CacheError> {
        self.like_query(content_type).cached_response(request)
    }
}
