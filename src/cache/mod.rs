//! Cache module for feed responses
//!
//! This module provides a disk-backed store for API responses and the
//! `CachedQuery` wrapper that composes it with a network method: network
//! first, write-through on success, cache fallback when the network fails.

mod query;
mod store;

pub use query::{CachedQuery, NetworkMethod, QueryError};
pub use store::{CacheError, CacheStore, CachedEntry};
