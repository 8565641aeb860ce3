// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for namespace operations.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::value_objects::parent_path;
use tagstore_domain::{Operation, TagstoreError, User};

use crate::application::caching::{
    CacheRegistry, CachingNamespaceApi, CachingPermissionChecker, InvalidationLog,
};
use crate::application::security::checker::{check_permissions, permission_denied};
use crate::application::services::namespace::NamespaceInfo;

/// The public API to secure namespace functionality.
pub struct SecureNamespaceApi {
    user: User,
    api: CachingNamespaceApi,
    checker: CachingPermissionChecker,
}

impl SecureNamespaceApi {
    /// Creates a secure namespace service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingNamespaceApi::new(user, cache, log),
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

    /// See [`crate::application::services::namespace::NamespaceApi::create`].
    ///
    /// Requires `CreateNamespace` on each parent path.
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

    /// See [`crate::application::services::namespace::NamespaceApi::delete`].
    ///
    /// Requires `DeleteNamespace` on each path.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = paths
            .iter()
            .map(|path| (path.clone(), Operation::DeleteNamespace))
            .collect();
        self.check(conn, checks).await?;
        self.api.delete(conn, paths).await
    }

    /// See [`crate::application::services::namespace::NamespaceApi::get`].
    ///
    /// Listing children requires `ListNamespace` on each path.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
        with_namespaces: bool,
        with_tags: bool,
    ) -> Result<HashMap<String, NamespaceInfo>, TagstoreError> {
        if with_namespaces || with_tags {
            let checks = paths
                .iter()
                .map(|path| (path.clone(), Operation::ListNamespace))
                .collect();
            self.check(conn, checks).await?;
        }
        self.api
            .get(conn, paths, with_descriptions, with_namespaces, with_tags)
            .await
    }

    /// See [`crate::application::services::namespace::NamespaceApi::set`].
    ///
    /// Requires `UpdateNamespace` on each path.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = values
            .keys()
            .map(|path| (path.clone(), Operation::UpdateNamespace))
            .collect();
        self.check(conn, checks).await?;
        self.api.set(conn, values).await
    }
}
