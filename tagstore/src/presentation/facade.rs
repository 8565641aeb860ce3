// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Facade
//!
//! The batched, security-checked entry points the HTTP frontend consumes.
//! Each call runs in one transaction on the main store: opened at entry,
//! committed on success, rolled back on any raised error.  Cache
//! invalidations recorded during the call are replayed after commit, and
//! index synchronisation happens out of band via the dirty-object log, so
//! nothing here blocks on the index.
//!
//! The frontend authenticates and passes the acting username; `anon` is
//! the anonymous user.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::{SqlitePool, Transaction};
use uuid::Uuid;

use tagstore_domain::entities::ActivityEntry;
use tagstore_domain::{
    Operation, Policy, Query, TagValue, TagValueEntry, TagstoreError, User,
};

use crate::application::caching::{CacheRegistry, InvalidationLog};
use crate::application::security::{
    SecureNamespaceApi, SecureObjectApi, SecurePermissionApi, SecureRecentActivityApi,
    SecureTagApi, SecureTagValueApi, SecureUserApi,
};
use crate::application::services::namespace::NamespaceInfo;
use crate::application::services::system::{create_system_data, SystemData};
use crate::application::services::tag::TagInfo;
use crate::application::services::user::UserUpdate;
use crate::infrastructure::cache::CacheClient;
use crate::infrastructure::index::{IndexClient, ObjectIndex};
use crate::infrastructure::repositories::{db_err, users};

/// The service facade: one struct owning the pool and the shared cache
/// and index handles.
pub struct Facade {
    pool: SqlitePool,
    cache: CacheRegistry,
    index: ObjectIndex,
}

impl Facade {
    /// Wires the facade over its backing services.
    pub fn new(
        pool: SqlitePool,
        cache_client: Arc<dyn CacheClient>,
        index_client: Arc<dyn IndexClient>,
        cache_expire_timeout: u64,
        index_shards: Option<String>,
    ) -> Self {
        Self {
            pool,
            cache: CacheRegistry::new(cache_client, cache_expire_timeout),
            index: ObjectIndex::new(index_client, index_shards),
        }
    }

    /// The pool handle, for the out-of-band index sync job.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The object index handle.
    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    /// Ensures the system users, namespaces and tags exist.
    pub async fn ensure_system_data(&self) -> Result<SystemData, TagstoreError> {
        let mut tx = self.begin().await?;
        let result = create_system_data(&mut tx).await;
        match result {
            Ok(system) => {
                tx.commit().await.map_err(db_err)?;
                Ok(system)
            }
            Err(error) => {
                let _ = tx.rollback().await;
                Err(error)
            }
        }
    }

    async fn begin(&self) -> Result<Transaction<'_, sqlx::Sqlite>, TagstoreError> {
        self.pool.begin().await.map_err(db_err)
    }

    async fn load_user(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        username: &str,
    ) -> Result<User, TagstoreError> {
        if username.is_empty() {
            return Err(TagstoreError::Unauthorized(
                "no authenticated user".to_string(),
            ));
        }
        users::get_user(tx, username)
            .await?
            .ok_or_else(|| TagstoreError::UnknownUser(vec![username.to_string()]))
    }

    /// Commits on success, rolls back on error, and replays recorded
    /// cache invalidations once the transaction is durable.
    async fn finish<T>(
        &self,
        tx: Transaction<'_, sqlx::Sqlite>,
        log: InvalidationLog,
        result: Result<T, TagstoreError>,
    ) -> Result<T, TagstoreError> {
        match result {
            Ok(value) => {
                tx.commit().await.map_err(db_err)?;
                let keys = log.drain();
                if !keys.is_empty() {
                    // Failures here only delay expiry; never surface them.
                    let _ = self.cache.client().delete(&keys).await;
                }
                Ok(value)
            }
            Err(error) => {
                let _ = tx.rollback().await;
                Err(error)
            }
        }
    }

    // ----- namespaces

    /// Creates namespaces from `(path, description)` pairs.
    pub async fn create_namespaces(
        &self,
        actor: &str,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureNamespaceApi::new(&user, &self.cache, &log)
                .create(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Deletes namespaces, refusing while children exist.
    pub async fn delete_namespaces(
        &self,
        actor: &str,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureNamespaceApi::new(&user, &self.cache, &log)
                .delete(&mut tx, paths)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Updates namespace descriptions.
    pub async fn set_namespaces(
        &self,
        actor: &str,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureNamespaceApi::new(&user, &self.cache, &log)
                .set(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets namespaces, with optional descriptions and child listings.
    pub async fn get_namespaces(
        &self,
        actor: &str,
        paths: &[String],
        with_descriptions: bool,
        with_namespaces: bool,
        with_tags: bool,
    ) -> Result<HashMap<String, NamespaceInfo>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureNamespaceApi::new(&user, &self.cache, &log)
                .get(&mut tx, paths, with_descriptions, with_namespaces, with_tags)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    // ----- tags

    /// Creates tags from `(path, description)` pairs.
    pub async fn create_tags(
        &self,
        actor: &str,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagApi::new(&user, &self.cache, &log)
                .create(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Deletes tags and their values.
    pub async fn delete_tags(
        &self,
        actor: &str,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagApi::new(&user, &self.cache, &log)
                .delete(&mut tx, paths)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Updates tag descriptions.
    pub async fn set_tags(
        &self,
        actor: &str,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagApi::new(&user, &self.cache, &log)
                .set(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets tags, with optional descriptions.
    pub async fn get_tags(
        &self,
        actor: &str,
        paths: &[String],
        with_descriptions: bool,
    ) -> Result<HashMap<String, TagInfo>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagApi::new(&user, &self.cache, &log)
                .get(&mut tx, paths, with_descriptions)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    // ----- tag values

    /// Sets values on objects, creating missing tags when permitted.
    pub async fn set_values(
        &self,
        actor: &str,
        updates: &HashMap<Uuid, HashMap<String, TagValue>>,
    ) -> Result<(), TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagValueApi::new(&user, &self.cache, &log)
                .set(&mut tx, updates)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets values on objects, all readable paths when `paths` is `None`.
    pub async fn get_values(
        &self,
        actor: &str,
        object_ids: &[Uuid],
        paths: Option<&[String]>,
    ) -> Result<HashMap<Uuid, HashMap<String, TagValueEntry>>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagValueApi::new(&user, &self.cache, &log)
                .get(&mut tx, object_ids, paths)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets the single value of one tag on one object.
    ///
    /// # Errors
    /// `NoInstanceOnObject` when the object carries no value for the
    /// path.
    pub async fn get_value(
        &self,
        actor: &str,
        object_id: Uuid,
        path: &str,
    ) -> Result<TagValueEntry, TagstoreError> {
        let paths = [path.to_string()];
        let mut values = self.get_values(actor, &[object_id], Some(&paths)).await?;
        values
            .remove(&object_id)
            .and_then(|mut entries| entries.remove(path))
            .ok_or_else(|| TagstoreError::NoInstanceOnObject {
                object_id,
                path: path.to_string(),
            })
    }

    /// Deletes values for `(object, path)` pairs.
    pub async fn delete_values(
        &self,
        actor: &str,
        pairs: &[(Uuid, String)],
    ) -> Result<u64, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureTagValueApi::new(&user, &self.cache, &log)
                .delete(&mut tx, pairs)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    // ----- permissions

    /// Gets `(policy, exceptions)` for `(path, operation)` keys.
    pub async fn get_permissions(
        &self,
        actor: &str,
        values: &[(String, Operation)],
    ) -> Result<HashMap<(String, Operation), (Policy, Vec<String>)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecurePermissionApi::new(&user, &self.cache, &log)
                .get(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Updates permissions from `(path, operation, policy, exceptions)`
    /// rows.
    pub async fn set_permissions(
        &self,
        actor: &str,
        values: &[(String, Operation, Policy, Vec<String>)],
    ) -> Result<(), TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecurePermissionApi::new(&user, &self.cache, &log)
                .set(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    // ----- objects and queries

    /// Creates an object, reusing the existing one when the about value
    /// is already taken.
    pub async fn create_object(
        &self,
        actor: &str,
        about: Option<&str>,
    ) -> Result<Uuid, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureObjectApi::new(&user, &self.cache, &log)
                .create(&mut tx, about)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets object IDs for about values.
    pub async fn get_objects_by_about(
        &self,
        actor: &str,
        about_values: &[String],
    ) -> Result<HashMap<String, Uuid>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureObjectApi::new(&user, &self.cache, &log)
                .get(&mut tx, about_values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Maps each object to the paths present on it that the actor may
    /// read.
    pub async fn get_object_tags(
        &self,
        actor: &str,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureObjectApi::new(&user, &self.cache, &log)
                .get_tags_by_objects(&mut tx, object_ids)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Parses and resolves queries, returning object-ID sets keyed by
    /// query text.
    pub async fn resolve_queries(
        &self,
        actor: &str,
        texts: &[String],
    ) -> Result<HashMap<String, HashSet<Uuid>>, TagstoreError> {
        let queries: Vec<Query> = texts
            .iter()
            .map(|text| Query::parse(text))
            .collect::<Result<_, _>>()?;

        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            // Only real users may implicitly mint objects for unknown
            // about values.
            let implicit_create = !user.is_anonymous();
            SecureObjectApi::new(&user, &self.cache, &log)
                .search(&mut tx, &self.index, &queries, implicit_create)
                .await
        }
        .await;
        let resolved = self.finish(tx, log, result).await?;
        Ok(resolved
            .into_iter()
            .map(|(query, object_ids)| (query.text().to_string(), object_ids))
            .collect())
    }

    // ----- users

    /// Creates users from `(username, password, fullname, email)` rows.
    pub async fn create_users(
        &self,
        actor: &str,
        values: &[(String, String, String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureUserApi::new(&user, &self.cache, &log)
                .create(&mut tx, values)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Gets a user's public record.
    pub async fn get_user(&self, actor: &str, username: &str) -> Result<User, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureUserApi::new(&user, &self.cache, &log)
                .get(&mut tx, username)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Updates users.
    pub async fn set_users(
        &self,
        actor: &str,
        updates: &[UserUpdate],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureUserApi::new(&user, &self.cache, &log)
                .set(&mut tx, updates)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Deletes users and their empty root namespaces.
    pub async fn delete_users(
        &self,
        actor: &str,
        usernames: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureUserApi::new(&user, &self.cache, &log)
                .delete(&mut tx, usernames)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    // ----- recent activity

    /// Recent tag values on objects.
    pub async fn recent_activity_for_objects(
        &self,
        actor: &str,
        object_ids: &[Uuid],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureRecentActivityApi::new(&user, &self.cache, &log)
                .get_for_objects(&mut tx, object_ids)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }

    /// Recent tag values written by users.
    pub async fn recent_activity_for_users(
        &self,
        actor: &str,
        usernames: &[String],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        let log = InvalidationLog::new();
        let mut tx = self.begin().await?;
        let result = async {
            let user = self.load_user(&mut tx, actor).await?;
            SecureRecentActivityApi::new(&user, &self.cache, &log)
                .get_for_users(&mut tx, usernames)
                .await
        }
        .await;
        self.finish(tx, log, result).await
    }
}
