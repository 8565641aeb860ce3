// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for permission reads and writes.
//!
//! Both are gated on the relevant CONTROL operation, and a denial is
//! reported against that CONTROL operation rather than the operation the
//! caller asked about, so probing permission data leaks nothing.

use std::collections::HashMap;

use sqlx::SqliteConnection;

use tagstore_domain::{Operation, Policy, TagstoreError, User};

use crate::application::caching::{
    CacheRegistry, CachingPermissionApi, CachingPermissionChecker, InvalidationLog,
};
use crate::application::security::checker::{check_permissions, permission_denied};

/// The public API to secure permission functionality.
pub struct SecurePermissionApi {
    user: User,
    api: CachingPermissionApi,
    checker: CachingPermissionChecker,
}

impl SecurePermissionApi {
    /// Creates a secure permission service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingPermissionApi::new(user, cache, log),
            checker: CachingPermissionChecker::new(cache),
        }
    }

    async fn check_control(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation)],
    ) -> Result<(), TagstoreError> {
        // Fail on unknown paths before leaking anything through denials.
        let unknown = self.checker.get_unknown_paths(conn, values).await?;
        if !unknown.is_empty() {
            let mut paths: Vec<String> = unknown.into_iter().collect();
            paths.sort();
            return Err(TagstoreError::UnknownPath(paths));
        }

        let checks: Vec<(String, Operation)> = values
            .iter()
            .map(|(path, operation)| {
                let control = operation.control_operation().ok_or_else(|| {
                    TagstoreError::feature(format!(
                        "{:?} has no per-path permission",
                        operation
                    ))
                })?;
                Ok((path.clone(), control))
            })
            .collect::<Result<_, TagstoreError>>()?;
        let denied = check_permissions(conn, &self.checker, &self.user, &checks).await?;
        if denied.is_empty() {
            Ok(())
        } else {
            Err(permission_denied(&self.user, denied))
        }
    }

    /// See [`crate::application::services::permission::PermissionApi::get`].
    ///
    /// Requires the CONTROL operation for each `(path, operation)` key.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation)],
    ) -> Result<HashMap<(String, Operation), (Policy, Vec<String>)>, TagstoreError> {
        if values.is_empty() {
            return Err(TagstoreError::feature(
                "can't get an empty list of permissions",
            ));
        }
        self.check_control(conn, values).await?;
        self.api.get(conn, values).await
    }

    /// See [`crate::application::services::permission::PermissionApi::set`].
    ///
    /// Requires the CONTROL operation for each `(path, operation)` key.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation, Policy, Vec<String>)],
    ) -> Result<(), TagstoreError> {
        let keys: Vec<(String, Operation)> = values
            .iter()
            .map(|(path, operation, _, _)| (path.clone(), *operation))
            .collect();
        self.check_control(conn, &keys).await?;
        self.api.set(conn, values).await
    }
}
