// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Write-through cache for permission objects.
//!
//! Keys are `permission:tag:<path>` and `permission:namespace:<path>`.
//! Payloads serialise as `{"<operation-id>": [<policy-id>, [<user-id>…]]}`;
//! the operation and policy IDs are the stable integers from the domain
//! enums, so a deployed cache survives binary upgrades.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use tagstore_domain::{Operation, Permission, Policy, UserId};

use super::client::{Cache, CacheClient, CacheResult};

/// Which permission family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Namespace,
    Tag,
}

impl PermissionKind {
    fn identifier(self, path: &str) -> String {
        match self {
            PermissionKind::Namespace => format!("namespace:{}", path),
            PermissionKind::Tag => format!("tag:{}", path),
        }
    }
}

/// Serialises a permission to its cache payload.
fn encode_permission(permission: &Permission) -> String {
    let mut payload = serde_json::Map::new();
    for (operation, policy, exceptions) in permission.entries() {
        payload.insert(
            operation.id().to_string(),
            serde_json::json!([policy.id(), exceptions]),
        );
    }
    serde_json::Value::Object(payload).to_string()
}

/// Deserialises a cache payload back to a permission, `None` if the
/// payload is unreadable.
fn decode_permission(payload: &str) -> Option<Permission> {
    let parsed: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(payload).ok()?;
    let mut entries = Vec::with_capacity(parsed.len());
    for (operation_id, entry) in &parsed {
        let operation = Operation::from_id(operation_id.parse().ok()?)?;
        let policy = Policy::from_id(entry.get(0)?.as_i64()?)?;
        let exceptions: Vec<UserId> = entry
            .get(1)?
            .as_array()?
            .iter()
            .map(|v| v.as_i64())
            .collect::<Option<_>>()?;
        entries.push((operation, policy, exceptions));
    }
    Some(Permission::from_entries(entries))
}

/// Caching for namespace and tag permission objects.
#[derive(Clone)]
pub struct PermissionCache {
    cache: Cache,
}

impl PermissionCache {
    /// Creates a permission cache over the shared client
    pub fn new(client: Arc<dyn CacheClient>, expire_timeout: u64) -> Self {
        Self {
            cache: Cache::new(client, "permission:", expire_timeout),
        }
    }

    /// Gets cached permissions for paths; unreadable or missing entries
    /// land in `uncached`.
    pub async fn get_permissions(
        &self,
        kind: PermissionKind,
        paths: &[String],
    ) -> CacheResult<String, Permission> {
        if paths.is_empty() {
            return CacheResult {
                results: HashMap::new(),
                uncached: vec![],
            };
        }
        let identifiers: Vec<String> = paths.iter().map(|p| kind.identifier(p)).collect();
        let Some(values) = self.cache.get_values(&identifiers).await else {
            return CacheResult {
                results: HashMap::new(),
                uncached: paths.to_vec(),
            };
        };

        let mut results = HashMap::new();
        let mut uncached = Vec::new();
        for (path, value) in paths.iter().zip(values) {
            match value.as_deref().and_then(decode_permission) {
                Some(permission) => {
                    results.insert(path.clone(), permission);
                }
                None => {
                    if value.is_some() {
                        warn!("dropping unreadable cached permission for {}", path);
                    }
                    uncached.push(path.clone());
                }
            }
        }
        CacheResult { results, uncached }
    }

    /// Saves permissions for paths.
    pub async fn save_permissions(
        &self,
        kind: PermissionKind,
        permissions: &HashMap<String, Permission>,
    ) {
        let values: Vec<(String, String)> = permissions
            .iter()
            .map(|(path, permission)| (kind.identifier(path), encode_permission(permission)))
            .collect();
        self.cache.set_values(&values).await;
    }

    /// Drops cached permissions for paths, returning the raw keys touched.
    pub async fn clear_permissions(
        &self,
        kind: PermissionKind,
        paths: &[String],
    ) -> Vec<String> {
        let identifiers: Vec<String> = paths.iter().map(|p| kind.identifier(p)).collect();
        self.cache.delete_values(&identifiers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::client::InMemoryCacheClient;

    #[tokio::test]
    async fn permissions_round_trip_through_the_cache() {
        let client = Arc::new(InMemoryCacheClient::new());
        let cache = PermissionCache::new(client.clone(), 60);

        let permission = Permission::tag_default(7);
        let mut permissions = HashMap::new();
        permissions.insert("alice/rating".to_string(), permission.clone());
        cache
            .save_permissions(PermissionKind::Tag, &permissions)
            .await;

        assert!(client.peek("permission:tag:alice/rating").is_some());

        let result = cache
            .get_permissions(
                PermissionKind::Tag,
                &["alice/rating".to_string(), "alice/other".to_string()],
            )
            .await;
        assert_eq!(result.results.get("alice/rating"), Some(&permission));
        assert_eq!(result.uncached, vec!["alice/other".to_string()]);
    }

    #[tokio::test]
    async fn namespace_and_tag_keys_do_not_collide() {
        let client = Arc::new(InMemoryCacheClient::new());
        let cache = PermissionCache::new(client, 60);

        let mut permissions = HashMap::new();
        permissions.insert("alice".to_string(), Permission::namespace_default(1));
        cache
            .save_permissions(PermissionKind::Namespace, &permissions)
            .await;

        let result = cache
            .get_permissions(PermissionKind::Tag, &["alice".to_string()])
            .await;
        assert!(result.results.is_empty());
        assert_eq!(result.uncached, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn clear_returns_the_touched_keys() {
        let client = Arc::new(InMemoryCacheClient::new());
        let cache = PermissionCache::new(client.clone(), 60);
        let mut permissions = HashMap::new();
        permissions.insert("alice/rating".to_string(), Permission::tag_default(1));
        cache
            .save_permissions(PermissionKind::Tag, &permissions)
            .await;

        let keys = cache
            .clear_permissions(PermissionKind::Tag, &["alice/rating".to_string()])
            .await;
        assert_eq!(keys, vec!["permission:tag:alice/rating".to_string()]);
        assert!(client.is_empty());
    }

    #[test]
    fn payload_format_is_stable() {
        let mut permission = Permission::tag_default(3);
        permission
            .set(Operation::ReadTagValue, Policy::Closed, vec![3, 9])
            .unwrap();
        let payload = encode_permission(&permission);
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        // ReadTagValue has id 10; Closed has id 0.
        assert_eq!(parsed["10"], serde_json::json!([0, [3, 9]]));
        let decoded = decode_permission(&payload).unwrap();
        assert_eq!(decoded, permission);
    }

    #[test]
    fn unreadable_payloads_decode_to_none() {
        assert!(decode_permission("not json").is_none());
        assert!(decode_permission(r#"{"999": [0, []]}"#).is_none());
    }
}
