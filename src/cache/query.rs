//! Cache-backed network queries
//!
//! Provides `CachedQuery`, a generic wrapper around a network method that
//! always attempts the network first, writes successful responses through to
//! the cache, and falls back to the cached response when the network fails.
//! Storage failures are propagated: the cache is the only alternate data
//! source, so a broken cache makes the whole query fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cache::store::{CacheError, CacheStore};

/// Errors returned by [`CachedQuery::execute`]
#[derive(Debug, Error)]
pub enum QueryError {
    /// The network call failed and no cached response was available
    #[error("network request failed with no cached fallback: {0}")]
    Network(#[source] ApiError),

    /// The cache itself failed (read or write)
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A network operation that takes a request value and produces a response
///
/// This is the seam between the cache wrapper and the REST client: production
/// code adapts `ApiClient` calls, tests substitute scripted fakes.
#[async_trait]
pub trait NetworkMethod<Req: Sync, Resp: Send>: Send + Sync {
    /// Performs the network call for the given request
    async fn call(&self, request: &Req) -> Result<Resp, ApiError>;
}

/// Wraps a network method with a read-through/write-through cache
///
/// The cache key is derived from the request by a caller-supplied function,
/// so one `CachedQuery` serves every subject of a feed type while keeping
/// their entries isolated.
///
/// Executions are serialized per cache key: a fetch/store pair for a key never
/// interleaves with another execution for the same key, while distinct keys
/// never contend. Across executions the most recent successful store wins.
pub struct CachedQuery<Req: Sync, Resp: Send> {
    method: Box<dyn NetworkMethod<Req, Resp>>,
    store: CacheStore,
    key_fn: Box<dyn Fn(&Req) -> String + Send + Sync>,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<Req, Resp> CachedQuery<Req, Resp>
where
    Req: Sync,
    Resp: Serialize + DeserializeOwned + Send,
{
    /// Creates a new cached query
    ///
    /// # Arguments
    /// * `method` - The underlying network operation
    /// * `store` - Cache store shared with other queries
    /// * `key_fn` - Derives the cache key from a request
    pub fn new(
        method: Box<dyn NetworkMethod<Req, Resp>>,
        store: CacheStore,
        key_fn: impl Fn(&Req) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            method,
            store,
            key_fn: Box::new(key_fn),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the per-key lock, creating it on first use
    fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Executes the request, preferring fresh network data
    ///
    /// 1. Attempts the network call.
    /// 2. On success, writes the response through to the cache and returns it;
    ///    a failed cache write fails the execution.
    /// 3. On network failure, returns the cached response if one exists,
    ///    otherwise the original network error. A failed cache read is an
    ///    error of its own.
    pub async fn execute(&self, request: &Req) -> Result<Resp, QueryError> {
        let key = (self.key_fn)(request);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        match self.method.call(request).await {
            Ok(response) => {
                self.store.write(&key, &response)?;
                Ok(response)
            }
            Err(network_err) => {
                debug!(%key, error = %network_err, "network call failed, trying cache");
                match self.store.read::<Resp>(&key)? {
                    Some(entry) => {
                        debug!(%key, cached_at = %entry.cached_at, "serving cached response");
                        Ok(entry.data)
                    }
                    None => {
                        warn!(%key, "no cached response to fall back to");
                        Err(QueryError::Network(network_err))
                    }
                }
            }
        }
    }

    /// Reads the cached response for a request without touching the network
    ///
    /// # Returns
    /// * `Ok(Some(resp))` if a response was previously cached for this key
    /// * `Ok(None)` if the key was never fetched successfully
    /// * `Err(CacheError)` if the store is unreachable or the entry corrupt
    pub fn cached_response(&self, request: &Req) -> Result<Option<Resp>, CacheError> {
        let key = (self.key_fn)(request);
        Ok(self.store.read::<Resp>(&key)?.map(|entry| entry.data))
    }

    /// Writes a response into the cache for a request's key
    pub fn store_response(&self, request: &Req, response: &Resp) -> Result<(), CacheError> {
        let key = (self.key_fn)(request);
        self.store.write(&key, response)
    }
}
