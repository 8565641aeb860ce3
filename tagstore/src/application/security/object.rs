// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for object operations.
//!
//! Creating objects is denied to anonymous users; queries require
//! `ReadTagValue` on every path they mention, the virtual `fluiddb/id`
//! tag excepted.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::{Operation, Query, TagstoreError, User};

use crate::application::caching::{
    CacheRegistry, CachingObjectApi, CachingPermissionChecker, InvalidationLog,
};
use crate::application::security::checker::{check_permissions, permission_denied};
use crate::application::services::ID_TAG;
use crate::infrastructure::index::ObjectIndex;

/// The public API to secure object functionality.
pub struct SecureObjectApi {
    user: User,
    api: CachingObjectApi,
    checker: CachingPermissionChecker,
}

impl SecureObjectApi {
    /// Creates a secure object service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, _log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingObjectApi::new(user, cache),
            checker: CachingPermissionChecker::new(cache),
        }
    }

    /// See [`crate::application::services::object::ObjectApi::create`].
    ///
    /// Requires `CreateObject`, which anonymous users never hold.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        about: Option<&str>,
    ) -> Result<Uuid, TagstoreError> {
        let checks = vec![(String::new(), Operation::CreateObject)];
        let denied = check_permissions(conn, &self.checker, &self.user, &checks).await?;
        if !denied.is_empty() {
            return Err(permission_denied(&self.user, denied));
        }
        self.api.create(conn, about).await
    }

    /// See [`crate::application::services::object::ObjectApi::get`].
    /// About values are public; no check applies.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        about_values: &[String],
    ) -> Result<HashMap<String, Uuid>, TagstoreError> {
        self.api.get(conn, about_values).await
    }

    /// See [`crate::application::services::object::ObjectApi::get_tags_by_objects`],
    /// filtered to the paths the user may read.
    pub async fn get_tags_by_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, TagstoreError> {
        let mut result = self.api.get_tags_by_objects(conn, object_ids).await?;
        let mut paths: HashSet<String> = HashSet::new();
        for object_paths in result.values() {
            paths.extend(object_paths.iter().cloned());
        }
        if paths.is_empty() {
            return Ok(result);
        }
        let checks: Vec<(String, Operation)> = paths
            .into_iter()
            .map(|path| (path, Operation::ReadTagValue))
            .collect();
        let denied = check_permissions(conn, &self.checker, &self.user, &checks).await?;
        let denied_paths: HashSet<String> =
            denied.into_iter().map(|(path, _)| path).collect();
        for object_paths in result.values_mut() {
            object_paths.retain(|path| !denied_paths.contains(path));
        }
        result.retain(|_, object_paths| !object_paths.is_empty());
        Ok(result)
    }

    /// See [`crate::application::services::object::ObjectApi::search`].
    ///
    /// Requires `ReadTagValue` on every path mentioned in every query.
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        index: &ObjectIndex,
        queries: &[Query],
        implicit_create: bool,
    ) -> Result<HashMap<Query, HashSet<Uuid>>, TagstoreError> {
        let mut paths: HashSet<String> = HashSet::new();
        for query in queries {
            paths.extend(
                query
                    .root()
                    .paths()
                    .into_iter()
                    .filter(|path| *path != ID_TAG)
                    .map(str::to_string),
            );
        }
        if !paths.is_empty() {
            let checks: Vec<(String, Operation)> = paths
                .into_iter()
                .map(|path| (path, Operation::ReadTagValue))
                .collect();
            let denied = check_permissions(conn, &self.checker, &self.user, &checks).await?;
            if !denied.is_empty() {
                return Err(permission_denied(&self.user, denied));
            }
        }
        self.api.search(conn, index, queries, implicit_create).await
    }
}
