// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Caches for recent-activity listings.
//!
//! Two key families: `recentactivity:object:<uuid>` and
//! `recentactivity:user:<username>`.  Only single-key lookups use these
//! caches; multi-key listings always hit the database, so the caching
//! wrappers decide when to come here.

use std::sync::Arc;

use tracing::warn;

use tagstore_domain::entities::ActivityEntry;

use super::client::{Cache, CacheClient};

/// Cache for one family of recent-activity listings.
#[derive(Clone)]
pub struct RecentActivityCache {
    cache: Cache,
}

impl RecentActivityCache {
    /// Cache for per-object listings.
    pub fn for_objects(client: Arc<dyn CacheClient>, expire_timeout: u64) -> Self {
        Self {
            cache: Cache::new(client, "recentactivity:object:", expire_timeout),
        }
    }

    /// Cache for per-user listings.
    pub fn for_users(client: Arc<dyn CacheClient>, expire_timeout: u64) -> Self {
        Self {
            cache: Cache::new(client, "recentactivity:user:", expire_timeout),
        }
    }

    /// Gets the cached listing for one identifier, `None` on miss or cache
    /// failure.
    pub async fn get(&self, identifier: &str) -> Option<Vec<ActivityEntry>> {
        let values = self.cache.get_values(&[identifier.to_string()]).await?;
        let payload = values.into_iter().next()??;
        match serde_json::from_str(&payload) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("dropping unreadable cached activity for {}: {}", identifier, e);
                None
            }
        }
    }

    /// Saves the listing for one identifier.
    pub async fn save(&self, identifier: &str, entries: &[ActivityEntry]) {
        match serde_json::to_string(entries) {
            Ok(payload) => {
                self.cache
                    .set_values(&[(identifier.to_string(), payload)])
                    .await;
            }
            Err(e) => warn!("failed to serialise activity for {}: {}", identifier, e),
        }
    }

    /// Drops the listings for identifiers, returning the raw keys touched.
    pub async fn clear(&self, identifiers: &[String]) -> Vec<String> {
        self.cache.delete_values(identifiers).await
    }
}
