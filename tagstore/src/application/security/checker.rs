// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batch Permission Check
//!
//! `check_permissions(user, [(path, operation)…])` returns the denied
//! pairs.  Evaluation order is fixed:
//!
//! 1. **Role shortcuts.**  Superusers pass everything; user managers pass
//!    the user operations; anonymous users fail everything outside
//!    listing and value reads; `fluiddb/id` reads always pass; root
//!    (empty-path) namespace operations fail for non-superusers.
//! 2. **Implicit creation.**  A value write to a missing tag or a create
//!    of a missing namespace walks up to the closest existing ancestor
//!    namespace and checks `CreateNamespace` there.  Other operations on
//!    missing paths raise `UnknownPath`.
//! 3. **Stored policy and exceptions**, loaded through the permission
//!    cache in one batch per entity kind.

use std::collections::HashSet;

use sqlx::SqliteConnection;

use tagstore_domain::{Operation, Role, TagstoreError, User};

use crate::application::caching::CachingPermissionChecker;
use crate::application::services::ID_TAG;

/// Checks a batch of `(path, operation)` pairs for `user` and returns the
/// denied pairs.
///
/// # Errors
/// `UnknownPath` when a referenced path does not exist and no
/// implicit-creation rule applies; `FeatureError` for nil paths or
/// operations invalid for their entity kind.
pub async fn check_permissions(
    conn: &mut SqliteConnection,
    checker: &CachingPermissionChecker,
    user: &User,
    values: &[(String, Operation)],
) -> Result<Vec<(String, Operation)>, TagstoreError> {
    let mut denied = Vec::new();
    let mut path_checks: Vec<(String, Operation)> = Vec::new();

    for (path, operation) in values {
        if operation.is_user_operation() {
            let allowed = match user.role {
                Role::Superuser | Role::UserManager => true,
                Role::User => {
                    *operation == Operation::UpdateUser && *path == user.username
                }
                Role::Anonymous => false,
            };
            if !allowed {
                denied.push((path.clone(), *operation));
            }
            continue;
        }
        if *operation == Operation::CreateObject {
            if user.is_anonymous() {
                denied.push((path.clone(), *operation));
            }
            continue;
        }

        // Path operations from here on.
        if user.is_superuser() {
            continue;
        }
        if user.is_anonymous() && !operation.allowed_for_anonymous() {
            denied.push((path.clone(), *operation));
            continue;
        }
        if *operation == Operation::ReadTagValue && path == ID_TAG {
            continue;
        }
        if path.is_empty() {
            // Creating or deleting root namespaces is a superuser affair.
            denied.push((path.clone(), *operation));
            continue;
        }
        path_checks.push((path.clone(), *operation));
    }

    if path_checks.is_empty() {
        return Ok(denied);
    }

    let unknown = checker.get_unknown_paths(conn, &path_checks).await?;
    let ancestors = checker.get_unknown_parent_paths(conn, &unknown).await?;

    // Operations that cannot implicitly create raise on unknown paths.
    let mut unresolvable: Vec<String> = path_checks
        .iter()
        .filter(|(path, operation)| {
            unknown.contains(path)
                && !matches!(
                    operation,
                    Operation::WriteTagValue | Operation::CreateNamespace
                )
        })
        .map(|(path, _)| path.clone())
        .collect();
    // Implicit creation needs an existing ancestor somewhere up the path.
    unresolvable.extend(
        path_checks
            .iter()
            .filter(|(path, _)| unknown.contains(path) && !ancestors.contains_key(path))
            .map(|(path, _)| path.clone()),
    );
    if !unresolvable.is_empty() {
        unresolvable.sort();
        unresolvable.dedup();
        return Err(TagstoreError::UnknownPath(unresolvable));
    }

    let mut namespace_paths: HashSet<String> = HashSet::new();
    let mut tag_paths: HashSet<String> = HashSet::new();
    for (path, operation) in &path_checks {
        if unknown.contains(path) {
            namespace_paths.insert(ancestors[path].clone());
        } else if operation.is_namespace_operation() {
            namespace_paths.insert(path.clone());
        } else {
            tag_paths.insert(path.clone());
        }
    }

    let namespace_list: Vec<String> = namespace_paths.into_iter().collect();
    let namespace_permissions = checker
        .get_namespace_permissions(conn, &namespace_list)
        .await?;
    let tag_list: Vec<String> = tag_paths.into_iter().collect();
    let tag_permissions = checker.get_tag_permissions(conn, &tag_list).await?;

    for (path, operation) in path_checks {
        let allowed = if unknown.contains(&path) {
            let ancestor = &ancestors[&path];
            let permission = namespace_permissions.get(ancestor).ok_or_else(|| {
                TagstoreError::UnknownPath(vec![ancestor.clone()])
            })?;
            permission.allow(Operation::CreateNamespace, user.id)?
        } else if operation.is_namespace_operation() {
            let permission = namespace_permissions
                .get(&path)
                .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            permission.allow(operation, user.id)?
        } else {
            let permission = tag_permissions
                .get(&path)
                .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            permission.allow(operation, user.id)?
        };
        if !allowed {
            denied.push((path, operation));
        }
    }
    Ok(denied)
}

/// Builds the `PermissionDenied` error for a non-empty denial list.
pub fn permission_denied(user: &User, denials: Vec<(String, Operation)>) -> TagstoreError {
    TagstoreError::PermissionDenied {
        username: user.username.clone(),
        denials,
    }
}
