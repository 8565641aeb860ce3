// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for tag operations.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::value_objects::parent_path;
use tagstore_domain::{Operation, TagstoreError, User};

use crate::application::caching::{
    CacheRegistry, CachingPermissionChecker, CachingTagApi, InvalidationLog,
};
use crate::application::security::checker::{check_permissions, permission_denied};
use crate::application::services::tag::TagInfo;

/// The public API to secure tag functionality.
pub struct SecureTagApi {
    user: User,
    api: CachingTagApi,
    checker: CachingPermissionChecker,
}

impl SecureTagApi {
    /// Creates a secure tag service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingTagApi::new(user, cache, log),
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

    /// See [`crate::application::services::tag::TagApi::create`].
    ///
    /// Requires `CreateNamespace` on each parent namespace.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = values
            .iter()
            .map(|(path, _)| {
                let parent = parent_path(path).unwrap_or("").to_string();
                (parent, Operation::CreateNamespace)
            })
            .collect();
        self.check(conn, checks).await?;
        self.api.create(conn, values).await
    }

    /// See [`crate::application::services::tag::TagApi::delete`].
    ///
    /// Requires `DeleteTag` on each path.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = paths
            .iter()
            .map(|path| (path.clone(), Operation::DeleteTag))
            .collect();
        self.check(conn, checks).await?;
        self.api.delete(conn, paths).await
    }

    /// See [`crate::application::services::tag::TagApi::get`].
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
    ) -> Result<HashMap<String, TagInfo>, TagstoreError> {
        self.api.get(conn, paths, with_descriptions).await
    }

    /// See [`crate::application::services::tag::TagApi::set`].
    ///
    /// Requires `UpdateTag` on each path.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = values
            .keys()
            .map(|path| (path.clone(), Operation::UpdateTag))
            .collect();
        self.check(conn, checks).await?;
        self.api.set(conn, values).await
    }
}
