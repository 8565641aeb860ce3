// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Cache for about-value → object-ID lookups.
//!
//! Keys are `about:<folded-value>` so lookups hit regardless of the case
//! the caller used.  About values never change once created, so there is
//! no invalidation path; entries simply expire.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use tagstore_domain::value_objects::fold_about;

use super::client::{Cache, CacheClient, CacheResult};

/// Caching for object lookups by about value.
#[derive(Clone)]
pub struct ObjectCache {
    cache: Cache,
}

impl ObjectCache {
    /// Creates an object cache over the shared client
    pub fn new(client: Arc<dyn CacheClient>, expire_timeout: u64) -> Self {
        Self {
            cache: Cache::new(client, "about:", expire_timeout),
        }
    }

    /// Gets cached object IDs for about values.  Results are keyed by the
    /// caller's original values.
    pub async fn get(&self, values: &[String]) -> CacheResult<String, Uuid> {
        if values.is_empty() {
            return CacheResult {
                results: HashMap::new(),
                uncached: vec![],
            };
        }
        let identifiers: Vec<String> = values.iter().map(|v| fold_about(v)).collect();
        let Some(cached) = self.cache.get_values(&identifiers).await else {
            return CacheResult {
                results: HashMap::new(),
                uncached: values.to_vec(),
            };
        };

        let mut results = HashMap::new();
        let mut uncached = Vec::new();
        for (value, entry) in values.iter().zip(cached) {
            match entry.as_deref().and_then(|id| Uuid::parse_str(id).ok()) {
                Some(object_id) => {
                    results.insert(value.clone(), object_id);
                }
                None => uncached.push(value.clone()),
            }
        }
        CacheResult { results, uncached }
    }

    /// Saves about → object-ID mappings.
    pub async fn save(&self, values: &HashMap<String, Uuid>) {
        let entries: Vec<(String, String)> = values
            .iter()
            .map(|(value, object_id)| (fold_about(value), object_id.to_string()))
            .collect();
        self.cache.set_values(&entries).await;
    }
}
