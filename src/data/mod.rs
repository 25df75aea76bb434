//! Core data models for the socialkit SDK
//!
//! This module contains the value types shared across the SDK: compact user
//! views, the signed-in account profile, paginated user lists, and the
//! enumerations that identify feeds, identity providers, and content types.

use serde::{Deserialize, Serialize};

/// Relationship of a user to the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowerStatus {
    /// No relationship
    None,
    /// The signed-in user follows this user
    Follow,
    /// A follow request is pending approval (private accounts)
    Pending,
    /// This user is blocked
    Blocked,
}

/// Third-party identity provider used for sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityProvider {
    Facebook,
    Microsoft,
    Google,
    Twitter,
}

/// Type of content a like feed is attached to
///
/// Unknown content types are unrepresentable: a like feed can only be
/// constructed for one of these three variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Topic,
    Comment,
    Reply,
}

impl ContentType {
    /// URL path segment for this content type
    pub fn path_segment(&self) -> &'static str {
        match self {
            ContentType::Topic => "topics",
            ContentType::Comment => "comments",
            ContentType::Reply => "replies",
        }
    }

    /// Cache key prefix for like feeds of this content type
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ContentType::Topic => "topic_likes",
            ContentType::Comment => "comment_likes",
            ContentType::Reply => "reply_likes",
        }
    }
}

/// Category of relationship feed addressed by a subject user handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserFeedType {
    /// Users following the subject
    Followers,
    /// Users the subject follows
    Following,
    /// Users blocked by the signed-in user
    Blocked,
    /// Incoming follow requests awaiting a decision
    PendingRequests,
}

impl UserFeedType {
    /// Cache key prefix for this feed type
    pub fn key_prefix(&self) -> &'static str {
        match self {
            UserFeedType::Followers => "followers",
            UserFeedType::Following => "following",
            UserFeedType::Blocked => "blocked",
            UserFeedType::PendingRequests => "pending_requests",
        }
    }

    /// Derives the cache key for this feed type and a subject user handle
    ///
    /// Keys for different (feed type, subject) pairs never collide, so caching
    /// the followers of one user cannot affect the entry for another user or
    /// for another feed of the same user.
    pub fn cache_key(&self, subject_handle: &str) -> String {
        format!("{}_{}", self.key_prefix(), subject_handle)
    }

    /// URL path segment for this feed type
    pub fn path_segment(&self) -> &'static str {
        match self {
            UserFeedType::Followers => "followers",
            UserFeedType::Following => "following",
            UserFeedType::Blocked => "blocked_users",
            UserFeedType::PendingRequests => "pending_users",
        }
    }
}

/// Compact view of a user, as shown in feeds and search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCompactView {
    /// Unique handle of the user
    pub user_handle: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Profile photo URL, if set
    pub photo_url: Option<String>,
    /// Whether the account is private
    pub is_private: bool,
    /// Relationship of this user to the signed-in user
    pub follower_status: FollowerStatus,
}

/// Profile data of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Profile photo URL, if set
    pub photo_url: Option<String>,
    /// Short biography, if set
    pub bio: Option<String>,
    /// Whether the account is private
    pub is_private: bool,
}

/// One page of a user feed
///
/// An empty page is a valid response; it is distinguishable from a feed that
/// was never fetched because it is still stored in the cache as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersPage {
    /// Users on this page
    pub users: Vec<UserCompactView>,
    /// Continuation cursor for the next page; `None` on the last page
    pub cursor: Option<String>,
}

impl UsersPage {
    /// An empty page with no continuation
    pub fn empty() -> Self {
        Self {
            users: Vec::new(),
            cursor: None,
        }
    }
}
