// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Permission Service
//!
//! Reading and writing permission objects by `(path, operation)` key, and
//! the checker primitives the security layer builds on: batch permission
//! loading, unknown-path detection, and the closest-ancestor walk behind
//! implicit creation.
//!
//! Exception lists cross this API as usernames; the integer user IDs are
//! a storage detail.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;

use tagstore_domain::value_objects::{parent_path, path_hierarchy};
use tagstore_domain::{Operation, Permission, Policy, Role, TagstoreError, User, UserId};

use crate::application::services::ID_TAG;
use crate::infrastructure::repositories::{namespaces, permissions, tags, users};

/// The public API for permissions in the model layer.
pub struct PermissionApi {
    #[allow(dead_code)]
    user: User,
}

impl PermissionApi {
    /// Creates a permission service acting on behalf of `user`
    pub fn new(user: &User) -> Self {
        Self { user: user.clone() }
    }

    /// Gets `(policy, exception usernames)` for `(path, operation)` keys.
    ///
    /// # Errors
    /// `FeatureError` for an empty batch or an operation with no
    /// permission family; `UnknownPath` if a path has no permission row.
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

        let mut namespace_paths = Vec::new();
        let mut tag_paths = Vec::new();
        for (path, operation) in values {
            if operation.is_namespace_operation() {
                namespace_paths.push(path.clone());
            } else if operation.is_tag_operation() {
                tag_paths.push(path.clone());
            } else {
                return Err(TagstoreError::feature(format!(
                    "{:?} has no per-path permission",
                    operation
                )));
            }
        }
        let namespace_permissions =
            permissions::get_namespace_permissions(conn, &namespace_paths).await?;
        let tag_permissions = permissions::get_tag_permissions(conn, &tag_paths).await?;

        // Resolve the user ids in every exception list in one round trip.
        let mut user_ids: HashSet<UserId> = HashSet::new();
        let mut raw = HashMap::new();
        for (path, operation) in values {
            let permission = if operation.is_namespace_operation() {
                namespace_permissions.get(path)
            } else {
                tag_permissions.get(path)
            }
            .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            let (policy, exceptions) = permission.get(*operation)?;
            user_ids.extend(exceptions.iter().copied());
            raw.insert((path.clone(), *operation), (policy, exceptions.to_vec()));
        }

        let id_list: Vec<UserId> = user_ids.into_iter().collect();
        let known = users::get_users(conn, None, Some(&id_list)).await?;
        let usernames: HashMap<UserId, String> = known
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        let mut result = HashMap::new();
        for (key, (policy, exceptions)) in raw {
            let names = exceptions
                .iter()
                .filter_map(|id| usernames.get(id).cloned())
                .collect();
            result.insert(key, (policy, names));
        }
        Ok(result)
    }

    /// Updates permissions from `(path, operation, policy, exception
    /// usernames)` rows.
    ///
    /// # Errors
    /// `UnknownUser` for unknown exception members;
    /// `UserNotAllowedInException` for a superuser, or an anonymous user
    /// outside the anonymous-allowed operations; `UnknownPath` for
    /// missing paths.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation, Policy, Vec<String>)],
    ) -> Result<(), TagstoreError> {
        if values.is_empty() {
            return Ok(());
        }

        let mut usernames: HashSet<String> = HashSet::new();
        for (_, _, _, exceptions) in values {
            usernames.extend(exceptions.iter().cloned());
        }
        let name_list: Vec<String> = usernames.iter().cloned().collect();
        let known = users::get_users(conn, Some(&name_list), None).await?;
        let mut ids_by_username = HashMap::new();
        let mut roles_by_username = HashMap::new();
        for user in known {
            ids_by_username.insert(user.username.clone(), user.id);
            roles_by_username.insert(user.username, user.role);
        }
        let unknown: Vec<String> = usernames
            .iter()
            .filter(|name| !ids_by_username.contains_key(*name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(TagstoreError::UnknownUser(unknown));
        }

        for (_, operation, _, exceptions) in values {
            for username in exceptions {
                match roles_by_username[username] {
                    Role::Superuser => {
                        return Err(TagstoreError::UserNotAllowedInException(
                            "can't put a superuser in an exceptions list".to_string(),
                        ));
                    }
                    Role::Anonymous if !operation.allowed_for_anonymous() => {
                        return Err(TagstoreError::UserNotAllowedInException(format!(
                            "can't put an anonymous user in an exceptions list for {:?}",
                            operation
                        )));
                    }
                    _ => {}
                }
            }
        }

        let mut namespace_updates: HashMap<String, Vec<(Operation, Policy, Vec<UserId>)>> =
            HashMap::new();
        let mut tag_updates: HashMap<String, Vec<(Operation, Policy, Vec<UserId>)>> =
            HashMap::new();
        for (path, operation, policy, exceptions) in values {
            let ids: Vec<UserId> = exceptions
                .iter()
                .map(|username| ids_by_username[username])
                .collect();
            if operation.is_namespace_operation() {
                namespace_updates
                    .entry(path.clone())
                    .or_default()
                    .push((*operation, *policy, ids));
            } else if operation.is_tag_operation() {
                tag_updates
                    .entry(path.clone())
                    .or_default()
                    .push((*operation, *policy, ids));
            } else {
                return Err(TagstoreError::feature(format!(
                    "can't set operation {:?}",
                    operation
                )));
            }
        }

        let namespace_paths: Vec<String> = namespace_updates.keys().cloned().collect();
        let mut loaded = permissions::get_namespace_permissions(conn, &namespace_paths).await?;
        for (path, updates) in namespace_updates {
            let permission = loaded
                .get_mut(&path)
                .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            for (operation, policy, exceptions) in updates {
                permission.set(operation, policy, exceptions)?;
            }
            permissions::update_namespace_permission(conn, &path, permission).await?;
        }

        let tag_paths: Vec<String> = tag_updates.keys().cloned().collect();
        let mut loaded = permissions::get_tag_permissions(conn, &tag_paths).await?;
        for (path, updates) in tag_updates {
            let permission = loaded
                .get_mut(&path)
                .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            for (operation, policy, exceptions) in updates {
                permission.set(operation, policy, exceptions)?;
            }
            permissions::update_tag_permission(conn, &path, permission).await?;
        }
        Ok(())
    }
}

/// The checker primitives behind `check_permissions`.
#[derive(Default)]
pub struct PermissionCheckerApi;

impl PermissionCheckerApi {
    /// Creates a permission checker
    pub fn new() -> Self {
        Self
    }

    /// Loads namespace permissions by path.
    pub async fn get_namespace_permissions(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<HashMap<String, Permission>, TagstoreError> {
        permissions::get_namespace_permissions(conn, paths).await
    }

    /// Loads tag permissions by path.
    pub async fn get_tag_permissions(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<HashMap<String, Permission>, TagstoreError> {
        permissions::get_tag_permissions(conn, paths).await
    }

    /// The paths among `values` that do not exist, honouring each
    /// operation's entity kind.  The virtual `fluiddb/id` tag always
    /// exists.
    ///
    /// # Errors
    /// `FeatureError` for a nil path or an operation without a path
    /// entity.
    pub async fn get_unknown_paths(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, Operation)],
    ) -> Result<HashSet<String>, TagstoreError> {
        let mut tag_paths: HashSet<String> = HashSet::new();
        let mut namespace_paths: HashSet<String> = HashSet::new();
        for (path, operation) in values {
            if path.is_empty() {
                return Err(TagstoreError::feature("a path must be provided"));
            }
            if operation.is_tag_operation() {
                tag_paths.insert(path.clone());
            } else if operation.is_namespace_operation() {
                namespace_paths.insert(path.clone());
            } else {
                return Err(TagstoreError::feature(format!(
                    "invalid operation {:?} for the path {:?}",
                    operation, path
                )));
            }
        }

        let mut unknown = HashSet::new();
        if !tag_paths.is_empty() {
            let list: Vec<String> = tag_paths.iter().cloned().collect();
            let found = tags::get_tags(conn, Some(&list), None).await?;
            let existing: HashSet<String> = found.into_iter().map(|t| t.path).collect();
            for path in tag_paths {
                if !existing.contains(&path) && path != ID_TAG {
                    unknown.insert(path);
                }
            }
        }
        if !namespace_paths.is_empty() {
            let list: Vec<String> = namespace_paths.iter().cloned().collect();
            let found = namespaces::get_namespaces(conn, Some(&list), None).await?;
            let existing: HashSet<String> = found.into_iter().map(|n| n.path).collect();
            for path in namespace_paths {
                if !existing.contains(&path) {
                    unknown.insert(path);
                }
            }
        }
        Ok(unknown)
    }

    /// Maps each unknown path to its closest existing ancestor namespace,
    /// walking up the hierarchy.  Paths with no existing ancestor are
    /// absent from the result.
    pub async fn get_unknown_parent_paths(
        &self,
        conn: &mut SqliteConnection,
        unknown_paths: &HashSet<String>,
    ) -> Result<HashMap<String, String>, TagstoreError> {
        if unknown_paths.is_empty() {
            return Ok(HashMap::new());
        }
        let hierarchy: Vec<String> = path_hierarchy(unknown_paths.iter().map(String::as_str))
            .into_iter()
            .collect();
        let found = namespaces::get_namespaces(conn, Some(&hierarchy), None).await?;
        let existing: HashSet<String> = found.into_iter().map(|n| n.path).collect();

        let mut closest = HashMap::new();
        for path in unknown_paths {
            let mut parent = parent_path(path);
            while let Some(current) = parent {
                if existing.contains(current) {
                    closest.insert(path.clone(), current.to_string());
                    break;
                }
                parent = parent_path(current);
            }
        }
        Ok(closest)
    }
}
