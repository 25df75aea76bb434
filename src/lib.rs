//! Socialkit - embeddable client SDK for a social networking platform
//!
//! The SDK gives host applications account management, relationship actions
//! (follow/block), and cached feed queries against the platform's REST API.
//! Feed reads go through a write-through disk cache: the network is always
//! tried first, successful responses overwrite the cached page, and when the
//! network is unavailable the last cached page is served instead.
//!
//! All collaborators are wired explicitly: construct an [`api::ApiClient`],
//! a [`cache::CacheStore`], and [`prefs::Preferences`], then hand them to
//! [`account::AccountManager`] and [`feeds::FeedClient`].

pub mod account;
pub mod api;
pub mod auth;
pub mod cache;
pub mod data;
pub mod feeds;
pub mod prefs;

pub use account::{AccountEvent, AccountManager};
pub use api::{ApiClient, ApiError};
pub use auth::{AuthenticationResponse, SignInRequest, SignOutRequest};
pub use cache::{CacheStore, CachedQuery, QueryError};
pub use data::{AccountData, ContentType, UserCompactView, UserFeedType, UsersPage};
pub use feeds::{FeedClient, FeedRequest};
pub use prefs::Preferences;
