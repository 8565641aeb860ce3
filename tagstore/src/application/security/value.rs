// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for tag-value operations.
//!
//! Reads with explicit paths fail loudly on a denial; reads with no path
//! list first compute the paths present on the objects, then silently
//! keep only the readable ones.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::{Operation, TagValue, TagValueEntry, TagstoreError, User};

use crate::application::caching::{
    CacheRegistry, CachingObjectApi, CachingPermissionChecker, CachingTagValueApi,
    InvalidationLog,
};
use crate::application::security::checker::{check_permissions, permission_denied};

/// The public API to secure tag-value functionality.
pub struct SecureTagValueApi {
    user: User,
    api: CachingTagValueApi,
    objects: CachingObjectApi,
    checker: CachingPermissionChecker,
}

impl SecureTagValueApi {
    /// Creates a secure tag-value service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingTagValueApi::new(user, cache, log),
            objects: CachingObjectApi::new(user, cache),
            checker: CachingPermissionChecker::new(cache),
        }
    }

    async fn check(
        &self,
        conn: &mut SqliteConnection,
        values: Vec<(String, Operation)>,
    ) -> Result<(), TagstoreError> {
        let denied = check_permissions(conn, &self.checker, &self.user, &values).await?;
        if denied.is_empty() {
            Ok(())
        } else {
            Err(permission_denied(&self.user, denied))
        }
    }

    /// See [`crate::application::services::value::TagValueApi::get`].
    ///
    /// With explicit `paths`, requires `ReadTagValue` on each.  Without,
    /// the readable subset of the objects' paths is computed first.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
        paths: Option<&[String]>,
    ) -> Result<HashMap<Uuid, HashMap<String, TagValueEntry>>, TagstoreError> {
        match paths {
            Some(paths) => {
                let checks = paths
                    .iter()
                    .map(|path| (path.clone(), Operation::ReadTagValue))
                    .collect();
                self.check(conn, checks).await?;
                self.api.get(conn, object_ids, Some(paths)).await
            }
            None => {
                let all_paths = self.objects.get_tags_for_objects(conn, object_ids).await?;
                if all_paths.is_empty() {
                    return self.api.get(conn, object_ids, Some(&[])).await;
                }
                let checks: Vec<(String, Operation)> = all_paths
                    .iter()
                    .map(|path| (path.clone(), Operation::ReadTagValue))
                    .collect();
                let denied =
                    check_permissions(conn, &self.checker, &self.user, &checks).await?;
                let denied_paths: HashSet<&String> =
                    denied.iter().map(|(path, _)| path).collect();
                let readable: Vec<String> = all_paths
                    .into_iter()
                    .filter(|path| !denied_paths.contains(path))
                    .collect();
                self.api.get(conn, object_ids, Some(&readable)).await
            }
        }
    }

    /// See [`crate::application::services::value::TagValueApi::set`].
    ///
    /// Requires `WriteTagValue` on each path; missing tags fall back to
    /// `CreateNamespace` on the closest existing ancestor.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        updates: &HashMap<Uuid, HashMap<String, TagValue>>,
    ) -> Result<(), TagstoreError> {
        let mut paths: HashSet<String> = HashSet::new();
        for tag_values in updates.values() {
            paths.extend(tag_values.keys().cloned());
        }
        let checks = paths
            .into_iter()
            .map(|path| (path, Operation::WriteTagValue))
            .collect();
        self.check(conn, checks).await?;
        self.api.set(conn, updates).await
    }

    /// See [`crate::application::services::value::TagValueApi::delete`].
    ///
    /// Requires `DeleteTagValue` on each path.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        pairs: &[(Uuid, String)],
    ) -> Result<u64, TagstoreError> {
        let checks = pairs
            .iter()
            .map(|(_, path)| (path.clone(), Operation::DeleteTagValue))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        self.check(conn, checks).await?;
        self.api.delete(conn, pairs).await
    }
}
