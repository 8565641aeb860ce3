// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for user management.
//!
//! The role shortcuts do the work here: user managers and superusers may
//! create, update and delete anyone; an ordinary user may update only
//! themselves; anonymous users may do nothing.

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::{Operation, TagstoreError, User};

use crate::application::caching::{CacheRegistry, CachingPermissionChecker, InvalidationLog};
use crate::application::security::checker::{check_permissions, permission_denied};
use crate::application::services::user::{UserApi, UserUpdate};

/// The public API to secure user functionality.
pub struct SecureUserApi {
    user: User,
    api: UserApi,
    checker: CachingPermissionChecker,
}

impl SecureUserApi {
    /// Creates a secure user service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, _log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: UserApi::new(),
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

    /// See [`UserApi::create`].  Requires `CreateUser`.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String, String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = values
            .iter()
            .map(|(username, _, _, _)| (username.clone(), Operation::CreateUser))
            .collect();
        self.check(conn, checks).await?;
        self.api.create(conn, values).await
    }

    /// See [`UserApi::get`].  User metadata is public.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<User, TagstoreError> {
        self.api.get(conn, username).await
    }

    /// See [`UserApi::set`].  Requires `UpdateUser` per username; plain
    /// users pass only for themselves.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        updates: &[UserUpdate],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = updates
            .iter()
            .map(|update| (update.username.clone(), Operation::UpdateUser))
            .collect();
        self.check(conn, checks).await?;
        self.api.set(conn, updates).await
    }

    /// See [`UserApi::delete`].  Requires `DeleteUser`.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        usernames: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let checks = usernames
            .iter()
            .map(|username| (username.clone(), Operation::DeleteUser))
            .collect();
        self.check(conn, checks).await?;
        self.api.delete(conn, usernames).await
    }
}
