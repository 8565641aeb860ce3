// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Caching Wrappers
//!
//! The layer between security and the model: permission loads, about
//! lookups and single-key recent-activity listings read through the
//! cache; mutations invalidate the affected keys.
//!
//! Correctness of invalidation depends on dropping keys *after* the
//! database transaction commits, but waiting would let a concurrent
//! reader re-populate a stale entry mid-request.  So wrappers invalidate
//! eagerly *and* record every key in the request's [`InvalidationLog`];
//! the facade replays the log against the cache once the transaction has
//! committed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::entities::ActivityEntry;
use tagstore_domain::{Operation, Permission, Policy, Query, TagValue, TagValueEntry, TagstoreError, User};

use crate::application::services::namespace::{NamespaceApi, NamespaceInfo};
use crate::application::services::object::ObjectApi;
use crate::application::services::permission::{PermissionApi, PermissionCheckerApi};
use crate::application::services::recent_activity::RecentActivityApi;
use crate::application::services::tag::{TagApi, TagInfo};
use crate::application::services::value::TagValueApi;
use crate::infrastructure::cache::{
    CacheClient, ObjectCache, PermissionCache, PermissionKind, RecentActivityCache,
};
use crate::infrastructure::index::ObjectIndex;

/// The process-wide cache handles, one per key family.
#[derive(Clone)]
pub struct CacheRegistry {
    pub permissions: PermissionCache,
    pub objects: ObjectCache,
    pub object_activity: RecentActivityCache,
    pub user_activity: RecentActivityCache,
    client: Arc<dyn CacheClient>,
}

impl CacheRegistry {
    /// Creates the cache handles over one shared client
    pub fn new(client: Arc<dyn CacheClient>, expire_timeout: u64) -> Self {
        Self {
            permissions: PermissionCache::new(client.clone(), expire_timeout),
            objects: ObjectCache::new(client.clone(), expire_timeout),
            object_activity: RecentActivityCache::for_objects(client.clone(), expire_timeout),
            user_activity: RecentActivityCache::for_users(client.clone(), expire_timeout),
            client,
        }
    }

    /// The shared client, used by the facade to replay invalidations.
    pub fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }
}

/// The cache keys a request invalidated, replayed after commit.
#[derive(Clone, Default)]
pub struct InvalidationLog {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InvalidationLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Records invalidated keys
    pub fn record<I: IntoIterator<Item = String>>(&self, keys: I) {
        self.keys.lock().extend(keys);
    }

    /// Takes every recorded key, leaving the log empty.
    pub fn drain(&self) -> Vec<String> {
        self.keys.lock().drain().collect()
    }
}

/// Permission loading with read-through caching, plus the pass-through
/// checker primitives.
pub struct CachingPermissionChecker {
    api: PermissionCheckerApi,
    cache: CacheRegistry,
}

impl CachingPermissionChecker {
    /// Creates a caching permission checker
    pub fn new(cache: &CacheRegistry) -> Self {
        Self {
            api: PermissionCheckerApi::new(),
            cache: cache.clone(),
        }
    }

    async fn get_permissions(
        &self,
        conn: &mut SqliteConnection,
        kind: PermissionKind,
        paths: &[String],
    ) -> Result<HashMap<String, Permission>, TagstoreError> {
        let cached = self.cache.permissions.get_permissions(kind, paths).await;
        let mut results = cached.results;
        if !cached.uncached.is_empty() {
            let loaded = match kind {
                PermissionKind::Namespace => {
                    self.api
                        .get_namespace_permissions(conn, &cached.uncached)
                        .await?
                }
                PermissionKind::Tag => {
                    self.api.get_tag_permissions(conn, &cached.uncached).await?
                }
            };
            if !loaded.is_empty() {
                self.cache.permissions.save_permissions(kind, &loaded).await;
                results.extend(loaded);
            }
        }
        Ok(results)
    }

    /// Loads namespace permissions, from the cache where possible.
    pub async fn get_namespace_permissions(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<HashMap<String, Permission>, TagstoreError> {
        self.get_permissions(conn, PermissionKind::Namespace, paths)
            .await
    }

    /// Loads tag permissions, from the cache where possible.
    pub async fn get_tag_permissions(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<HashMap<String, Permission>, TagstoreError> {
        self.get_permissions(conn, PermissionKind::Tag, paths).await
    }

    /// See [`PermissionCheckerApi::get_unknown_paths`].
    pub async fn get_unknown_paths(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation)],
    ) -> Result<HashSet<String>, TagstoreError> {
        self.api.get_unknown_paths(conn, values).await
    }

    /// See [`PermissionCheckerApi::get_unknown_parent_paths`].
    pub async fn get_unknown_parent_paths(
        &self,
        conn: &mut SqliteConnection,
        unknown_paths: &HashSet<String>,
    ) -> Result<HashMap<String, String>, TagstoreError> {
        self.api.get_unknown_parent_paths(conn, unknown_paths).await
    }
}

/// Permission updates with cache invalidation.
pub struct CachingPermissionApi {
    api: PermissionApi,
    cache: CacheRegistry,
    log: InvalidationLog,
}

impl CachingPermissionApi {
    /// Creates a caching permission service
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            api: PermissionApi::new(user),
            cache: cache.clone(),
            log: log.clone(),
        }
    }

    /// See [`PermissionApi::get`].
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation)],
    ) -> Result<HashMap<(String, Operation), (Policy, Vec<String>)>, TagstoreError> {
        self.api.get(conn, values).await
    }

    /// See [`PermissionApi::set`].  Modified permissions leave the cache.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation, Policy, Vec<String>)],
    ) -> Result<(), TagstoreError> {
        let namespace_paths: Vec<String> = values
            .iter()
            .filter(|(_, operation, _, _)| operation.is_namespace_operation())
            .map(|(path, _, _, _)| path.clone())
            .collect();
        let tag_paths: Vec<String> = values
            .iter()
            .filter(|(_, operation, _, _)| operation.is_tag_operation())
            .map(|(path, _, _, _)| path.clone())
            .collect();
        let keys = self
            .cache
            .permissions
            .clear_permissions(PermissionKind::Namespace, &namespace_paths)
            .await;
        self.log.record(keys);
        let keys = self
            .cache
            .permissions
            .clear_permissions(PermissionKind::Tag, &tag_paths)
            .await;
        self.log.record(keys);

        self.api.set(conn, values).await
    }
}

/// Object lookups with about-value caching.
pub struct CachingObjectApi {
    api: ObjectApi,
    cache: CacheRegistry,
}

impl CachingObjectApi {
    /// Creates a caching object service
    pub fn new(user: &User, cache: &CacheRegistry) -> Self {
        Self {
            api: ObjectApi::new(user),
            cache: cache.clone(),
        }
    }

    /// See [`ObjectApi::create`].
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        about: Option<&str>,
    ) -> Result<Uuid, TagstoreError> {
        self.api.create(conn, about).await
    }

    /// See [`ObjectApi::get`], with cached about lookups.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        about_values: &[String],
    ) -> Result<HashMap<String, Uuid>, TagstoreError> {
        let cached = self.cache.objects.get(about_values).await;
        let mut results = cached.results;
        if !cached.uncached.is_empty() {
            let loaded = self.api.get(conn, &cached.uncached).await?;
            if !loaded.is_empty() {
                self.cache.objects.save(&loaded).await;
                results.extend(loaded);
            }
        }
        Ok(results)
    }

    /// See [`ObjectApi::get_tags_by_objects`].
    pub async fn get_tags_by_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, TagstoreError> {
        self.api.get_tags_by_objects(conn, object_ids).await
    }

    /// See [`ObjectApi::get_tags_for_objects`].
    pub async fn get_tags_for_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<Vec<String>, TagstoreError> {
        self.api.get_tags_for_objects(conn, object_ids).await
    }

    /// See [`ObjectApi::search`].
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        index: &ObjectIndex,
        queries: &[Query],
        implicit_create: bool,
    ) -> Result<HashMap<Query, HashSet<Uuid>>, TagstoreError> {
        self.api.search(conn, index, queries, implicit_create).await
    }
}

/// Namespace mutations with permission-cache invalidation.
pub struct CachingNamespaceApi {
    api: NamespaceApi,
    cache: CacheRegistry,
    log: InvalidationLog,
}

impl CachingNamespaceApi {
    /// Creates a caching namespace service
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            api: NamespaceApi::new(user),
            cache: cache.clone(),
            log: log.clone(),
        }
    }

    /// See [`NamespaceApi::create`].
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        self.api.create(conn, values).await
    }

    /// See [`NamespaceApi::delete`]; drops the namespaces' permission
    /// entries.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let deleted = self.api.delete(conn, paths).await?;
        let keys = self
            .cache
            .permissions
            .clear_permissions(PermissionKind::Namespace, paths)
            .await;
        self.log.record(keys);
        Ok(deleted)
    }

    /// See [`NamespaceApi::get`].
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
        with_namespaces: bool,
        with_tags: bool,
    ) -> Result<HashMap<String, NamespaceInfo>, TagstoreError> {
        self.api
            .get(conn, paths, with_descriptions, with_namespaces, with_tags)
            .await
    }

    /// See [`NamespaceApi::set`].
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        self.api.set(conn, values).await
    }
}

/// Tag mutations with permission- and activity-cache invalidation.
pub struct CachingTagApi {
    api: TagApi,
    user: User,
    cache: CacheRegistry,
    log: InvalidationLog,
}

impl CachingTagApi {
    /// Creates a caching tag service
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            api: TagApi::new(user),
            user: user.clone(),
            cache: cache.clone(),
            log: log.clone(),
        }
    }

    /// See [`TagApi::create`].
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        self.api.create(conn, values).await
    }

    /// See [`TagApi::delete`]; drops the tags' permission entries and the
    /// related activity listings.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let deleted = self.api.delete(conn, paths).await?;
        let keys = self
            .cache
            .permissions
            .clear_permissions(PermissionKind::Tag, paths)
            .await;
        self.log.record(keys);

        let activity_ids: Vec<String> = deleted
            .iter()
            .map(|(object_id, _)| object_id.to_string())
            .collect();
        let keys = self.cache.object_activity.clear(&activity_ids).await;
        self.log.record(keys);
        let keys = self
            .cache
            .user_activity
            .clear(&[self.user.username.clone()])
            .await;
        self.log.record(keys);
        Ok(deleted)
    }

    /// See [`TagApi::get`].
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
    ) -> Result<HashMap<String, TagInfo>, TagstoreError> {
        self.api.get(conn, paths, with_descriptions).await
    }

    /// See [`TagApi::set`].
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        self.api.set(conn, values).await
    }
}

/// Tag-value mutations with activity-cache invalidation.
pub struct CachingTagValueApi {
    api: TagValueApi,
    user: User,
    cache: CacheRegistry,
    log: InvalidationLog,
}

impl CachingTagValueApi {
    /// Creates a caching tag-value service
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            api: TagValueApi::new(user),
            user: user.clone(),
            cache: cache.clone(),
            log: log.clone(),
        }
    }

    async fn clear_activity(&self, object_ids: &[Uuid]) {
        let identifiers: Vec<String> = object_ids.iter().map(Uuid::to_string).collect();
        let keys = self.cache.object_activity.clear(&identifiers).await;
        self.log.record(keys);
        let keys = self
            .cache
            .user_activity
            .clear(&[self.user.username.clone()])
            .await;
        self.log.record(keys);
    }

    /// See [`TagValueApi::get`].
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
        paths: Option<&[String]>,
    ) -> Result<HashMap<Uuid, HashMap<String, TagValueEntry>>, TagstoreError> {
        self.api.get(conn, object_ids, paths).await
    }

    /// See [`TagValueApi::set`]; drops activity listings for the touched
    /// objects and the acting user.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        updates: &HashMap<Uuid, HashMap<String, TagValue>>,
    ) -> Result<(), TagstoreError> {
        self.api.set(conn, updates).await?;
        let object_ids: Vec<Uuid> = updates.keys().copied().collect();
        self.clear_activity(&object_ids).await;
        Ok(())
    }

    /// See [`TagValueApi::delete`]; drops activity listings for the
    /// touched objects and the acting user.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        pairs: &[(Uuid, String)],
    ) -> Result<u64, TagstoreError> {
        let deleted = self.api.delete(conn, pairs).await?;
        let object_ids: Vec<Uuid> = pairs
            .iter()
            .map(|(object_id, _)| *object_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        self.clear_activity(&object_ids).await;
        Ok(deleted)
    }
}

/// Recent-activity listings with single-key caching.  Multi-key lookups
/// bypass the cache.
pub struct CachingRecentActivityApi {
    api: RecentActivityApi,
    cache: CacheRegistry,
}

impl CachingRecentActivityApi {
    /// Creates a caching recent-activity service
    pub fn new(cache: &CacheRegistry) -> Self {
        Self {
            api: RecentActivityApi::new(),
            cache: cache.clone(),
        }
    }

    /// See [`RecentActivityApi::get_for_objects`].
    pub async fn get_for_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        if object_ids.len() != 1 {
            return self.api.get_for_objects(conn, object_ids).await;
        }
        let identifier = object_ids[0].to_string();
        if let Some(entries) = self.cache.object_activity.get(&identifier).await {
            return Ok(entries);
        }
        let entries = self.api.get_for_objects(conn, object_ids).await?;
        if !entries.is_empty() {
            self.cache.object_activity.save(&identifier, &entries).await;
        }
        Ok(entries)
    }

    /// See [`RecentActivityApi::get_for_users`].
    pub async fn get_for_users(
        &self,
        conn: &mut SqliteConnection,
        usernames: &[String],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        if usernames.len() != 1 {
            return self.api.get_for_users(conn, usernames).await;
        }
        let identifier = usernames[0].clone();
        if let Some(entries) = self.cache.user_activity.get(&identifier).await {
            return Ok(entries);
        }
        let entries = self.api.get_for_users(conn, usernames).await?;
        if !entries.is_empty() {
            self.cache.user_activity.save(&identifier, &entries).await;
        }
        Ok(entries)
    }
}
