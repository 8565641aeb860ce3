// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cache Client
//!
//! A Redis-like key-value cache behind a narrow trait: multi-get, pipelined
//! set-with-expiry, delete.  Production uses the `redis` connection
//! manager; tests use the in-memory and always-failing implementations.
//!
//! The cardinal rule of this layer is that **cache failures never become
//! request failures**: the `Cache` helper wrapping the client logs errors
//! and reports misses instead, so a cache outage degrades to the database
//! path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::error;

/// A cache transport failure.
#[derive(Error, Debug, Clone)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// The key-value operations the caching layer needs.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Gets the values for `keys`, position-for-position; `None` for
    /// missing keys.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Sets `entries`, each expiring after `ttl_seconds`.
    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl_seconds: u64,
    ) -> Result<(), CacheError>;

    /// Deletes `keys`.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;
}

/// Redis-backed cache client using a shared connection manager.
pub struct RedisCacheClient {
    manager: redis::aio::ConnectionManager,
}

impl RedisCacheClient {
    /// Connects to the cache at `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let mut manager = self.manager.clone();
        let mut command = redis::cmd("MGET");
        for key in keys {
            command.arg(key);
        }
        command
            .query_async(&mut manager)
            .await
            .map_err(|e| CacheError(e.to_string()))
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut manager = self.manager.clone();
        let mut pipeline = redis::pipe();
        for (key, value) in entries {
            pipeline.cmd("SETEX").arg(key).arg(ttl_seconds).arg(value).ignore();
        }
        let () = pipeline
            .query_async(&mut manager)
            .await
            .map_err(|e| CacheError(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut manager = self.manager.clone();
        let mut command = redis::cmd("DEL");
        for key in keys {
            command.arg(key);
        }
        let () = command
            .query_async(&mut manager)
            .await
            .map_err(|e| CacheError(e.to_string()))?;
        Ok(())
    }
}

/// In-memory cache client for tests and single-process runs.  Expiry is
/// ignored; entries live until deleted.
#[derive(Default)]
pub struct InMemoryCacheClient {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryCacheClient {
    /// Creates an empty in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of live entries, for test assertions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Checks if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Gets a raw entry, for test assertions.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

#[async_trait]
impl CacheClient for InMemoryCacheClient {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let entries = self.entries.lock();
        Ok(keys.iter().map(|key| entries.get(key).cloned()).collect())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        _ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let mut store = self.entries.lock();
        for (key, value) in entries {
            store.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut store = self.entries.lock();
        for key in keys {
            store.remove(key);
        }
        Ok(())
    }
}

/// A cache client whose every operation fails, exercising the degraded
/// path in tests.
#[derive(Default)]
pub struct BrokenCacheClient;

#[async_trait]
impl CacheClient for BrokenCacheClient {
    async fn mget(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Err(CacheError("cache is broken".to_string()))
    }

    async fn set_many(
        &self,
        _entries: &[(String, String)],
        _ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        Err(CacheError("cache is broken".to_string()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        Err(CacheError("cache is broken".to_string()))
    }
}

/// The result of a cache lookup: what was found, and which identifiers
/// must fall through to the database.
pub struct CacheResult<K, V> {
    pub results: HashMap<K, V>,
    pub uncached: Vec<K>,
}

/// A prefixed view over a cache client with the error-swallowing contract:
/// transport failures are logged and reported as total misses (reads) or
/// ignored (writes and deletes).
#[derive(Clone)]
pub struct Cache {
    client: Arc<dyn CacheClient>,
    prefix: &'static str,
    expire_timeout: u64,
}

impl Cache {
    /// Creates a prefixed cache view
    pub fn new(client: Arc<dyn CacheClient>, prefix: &'static str, expire_timeout: u64) -> Self {
        Self {
            client,
            prefix,
            expire_timeout,
        }
    }

    /// The full cache key for an identifier.
    pub fn key(&self, identifier: &str) -> String {
        format!("{}{}", self.prefix, identifier)
    }

    /// Gets values for identifiers; `None` means the cache is unavailable
    /// and every identifier should be treated as a miss.
    pub async fn get_values(&self, identifiers: &[String]) -> Option<Vec<Option<String>>> {
        if identifiers.is_empty() {
            return Some(vec![]);
        }
        let keys: Vec<String> = identifiers.iter().map(|id| self.key(id)).collect();
        match self.client.mget(&keys).await {
            Ok(values) => Some(values),
            Err(e) => {
                error!("cache error: {}", e);
                None
            }
        }
    }

    /// Sets values for identifiers, ignoring cache failure.
    pub async fn set_values(&self, values: &[(String, String)]) {
        if values.is_empty() {
            return;
        }
        let entries: Vec<(String, String)> = values
            .iter()
            .map(|(id, value)| (self.key(id), value.clone()))
            .collect();
        if let Err(e) = self.client.set_many(&entries, self.expire_timeout).await {
            error!("cache error: {}", e);
        }
    }

    /// Deletes values for identifiers, ignoring cache failure, and returns
    /// the raw keys touched so callers can re-invalidate after commit.
    pub async fn delete_values(&self, identifiers: &[String]) -> Vec<String> {
        if identifiers.is_empty() {
            return vec![];
        }
        let keys: Vec<String> = identifiers.iter().map(|id| self.key(id)).collect();
        if let Err(e) = self.client.delete(&keys).await {
            error!("cache error: {}", e);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let client = InMemoryCacheClient::new();
        client
            .set_many(&[("a".to_string(), "1".to_string())], 60)
            .await
            .unwrap();
        assert_eq!(
            client.mget(&["a".to_string(), "b".to_string()]).await.unwrap(),
            vec![Some("1".to_string()), None]
        );
        client.delete(&["a".to_string()]).await.unwrap();
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn cache_swallows_broken_client_errors() {
        let cache = Cache::new(Arc::new(BrokenCacheClient), "test:", 60);
        assert!(cache.get_values(&["a".to_string()]).await.is_none());
        cache
            .set_values(&[("a".to_string(), "1".to_string())])
            .await;
        let keys = cache.delete_values(&["a".to_string()]).await;
        assert_eq!(keys, vec!["test:a".to_string()]);
    }

    #[tokio::test]
    async fn cache_prefixes_keys() {
        let client = Arc::new(InMemoryCacheClient::new());
        let cache = Cache::new(client.clone(), "permission:", 60);
        cache
            .set_values(&[("tag:a/b".to_string(), "{}".to_string())])
            .await;
        assert_eq!(client.peek("permission:tag:a/b"), Some("{}".to_string()));
        let values = cache.get_values(&["tag:a/b".to_string()]).await.unwrap();
        assert_eq!(values, vec![Some("{}".to_string())]);
    }
}
