// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for permission rows.
//!
//! Permissions are stored one row per namespace or tag with a policy
//! column (1 open, 0 closed) and a JSON-array exception column per
//! operation.  The column layout is fixed; `Operation` order maps onto the
//! column prefixes below.

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};

use tagstore_domain::{NamespaceId, Operation, Permission, Policy, TagId, TagstoreError, UserId};

use super::{db_err, placeholders};

const NAMESPACE_COLUMNS: &[(Operation, &str)] = &[
    (Operation::CreateNamespace, "create"),
    (Operation::UpdateNamespace, "update"),
    (Operation::DeleteNamespace, "delete"),
    (Operation::ListNamespace, "list"),
    (Operation::ControlNamespace, "control"),
];

const TAG_COLUMNS: &[(Operation, &str)] = &[
    (Operation::UpdateTag, "update"),
    (Operation::DeleteTag, "delete"),
    (Operation::ControlTag, "control"),
    (Operation::WriteTagValue, "write_value"),
    (Operation::ReadTagValue, "read_value"),
    (Operation::DeleteTagValue, "delete_value"),
    (Operation::ControlTagValue, "control_value"),
];

fn row_to_permission(
    row: &sqlx::sqlite::SqliteRow,
    columns: &[(Operation, &str)],
) -> Result<Permission, TagstoreError> {
    let mut entries = Vec::with_capacity(columns.len());
    for &(operation, prefix) in columns {
        let policy_id: i64 = row
            .try_get(format!("{}_policy", prefix).as_str())
            .map_err(db_err)?;
        let policy = Policy::from_id(policy_id).ok_or_else(|| {
            TagstoreError::DatabaseError(format!("bad policy id: {}", policy_id))
        })?;
        let exceptions_json: String = row
            .try_get(format!("{}_exceptions", prefix).as_str())
            .map_err(db_err)?;
        let exceptions: Vec<UserId> = serde_json::from_str(&exceptions_json)?;
        entries.push((operation, policy, exceptions));
    }
    Ok(Permission::from_entries(entries))
}

fn permission_bindings(
    permission: &Permission,
    columns: &[(Operation, &str)],
) -> Result<Vec<(i64, String)>, TagstoreError> {
    let mut bindings = Vec::with_capacity(columns.len());
    for &(operation, _) in columns {
        let (policy, exceptions) = permission.get(operation)?;
        bindings.push((policy.id(), serde_json::to_string(exceptions)?));
    }
    Ok(bindings)
}

/// Creates the permission row for a new namespace.
pub async fn create_namespace_permission(
    conn: &mut SqliteConnection,
    namespace_id: NamespaceId,
    permission: &Permission,
) -> Result<(), TagstoreError> {
    let bindings = permission_bindings(permission, NAMESPACE_COLUMNS)?;
    let mut query = sqlx::query(
        "INSERT INTO namespace_permissions \
         (namespace_id, create_policy, create_exceptions, update_policy, update_exceptions, \
          delete_policy, delete_exceptions, list_policy, list_exceptions, \
          control_policy, control_exceptions) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(namespace_id);
    for (policy, exceptions) in bindings {
        query = query.bind(policy).bind(exceptions);
    }
    query.execute(&mut *conn).await.map_err(db_err)?;
    Ok(())
}

/// Creates the permission row for a new tag.
pub async fn create_tag_permission(
    conn: &mut SqliteConnection,
    tag_id: TagId,
    permission: &Permission,
) -> Result<(), TagstoreError> {
    let bindings = permission_bindings(permission, TAG_COLUMNS)?;
    let mut query = sqlx::query(
        "INSERT INTO tag_permissions \
         (tag_id, update_policy, update_exceptions, delete_policy, delete_exceptions, \
          control_policy, control_exceptions, write_value_policy, write_value_exceptions, \
          read_value_policy, read_value_exceptions, delete_value_policy, delete_value_exceptions, \
          control_value_policy, control_value_exceptions) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(tag_id);
    for (policy, exceptions) in bindings {
        query = query.bind(policy).bind(exceptions);
    }
    query.execute(&mut *conn).await.map_err(db_err)?;
    Ok(())
}

/// Gets namespace permissions for the specified paths.
pub async fn get_namespace_permissions(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<HashMap<String, Permission>, TagstoreError> {
    if paths.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT n.path AS path, p.* FROM namespace_permissions p \
         JOIN namespaces n ON p.namespace_id = n.id WHERE n.path IN ({})",
        placeholders(paths.len())
    );
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;

    let mut permissions = HashMap::with_capacity(rows.len());
    for row in &rows {
        let path: String = row.try_get("path").map_err(db_err)?;
        permissions.insert(path, row_to_permission(row, NAMESPACE_COLUMNS)?);
    }
    Ok(permissions)
}

/// Gets tag permissions for the specified paths.
pub async fn get_tag_permissions(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<HashMap<String, Permission>, TagstoreError> {
    if paths.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT t.path AS path, p.* FROM tag_permissions p \
         JOIN tags t ON p.tag_id = t.id WHERE t.path IN ({})",
        placeholders(paths.len())
    );
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;

    let mut permissions = HashMap::with_capacity(rows.len());
    for row in &rows {
        let path: String = row.try_get("path").map_err(db_err)?;
        permissions.insert(path, row_to_permission(row, TAG_COLUMNS)?);
    }
    Ok(permissions)
}

/// Replaces the stored permission for a namespace path.
pub async fn update_namespace_permission(
    conn: &mut SqliteConnection,
    path: &str,
    permission: &Permission,
) -> Result<u64, TagstoreError> {
    let bindings = permission_bindings(permission, NAMESPACE_COLUMNS)?;
    let mut query = sqlx::query(
        "UPDATE namespace_permissions SET \
         create_policy = ?, create_exceptions = ?, update_policy = ?, update_exceptions = ?, \
         delete_policy = ?, delete_exceptions = ?, list_policy = ?, list_exceptions = ?, \
         control_policy = ?, control_exceptions = ? \
         WHERE namespace_id = (SELECT id FROM namespaces WHERE path = ?)",
    );
    for (policy, exceptions) in bindings {
        query = query.bind(policy).bind(exceptions);
    }
    let result = query.bind(path).execute(&mut *conn).await.map_err(db_err)?;
    Ok(result.rows_affected())
}

/// Replaces the stored permission for a tag path.
pub async fn update_tag_permission(
    conn: &mut SqliteConnection,
    path: &str,
    permission: &Permission,
) -> Result<u64, TagstoreError> {
    let bindings = permission_bindings(permission, TAG_COLUMNS)?;
    let mut query = sqlx::query(
        "UPDATE tag_permissions SET \
         update_policy = ?, update_exceptions = ?, delete_policy = ?, delete_exceptions = ?, \
         control_policy = ?, control_exceptions = ?, \
         write_value_policy = ?, write_value_exceptions = ?, \
         read_value_policy = ?, read_value_exceptions = ?, \
         delete_value_policy = ?, delete_value_exceptions = ?, \
         control_value_policy = ?, control_value_exceptions = ? \
         WHERE tag_id = (SELECT id FROM tags WHERE path = ?)",
    );
    for (policy, exceptions) in bindings {
        query = query.bind(policy).bind(exceptions);
    }
    let result = query.bind(path).execute(&mut *conn).await.map_err(db_err)?;
    Ok(result.rows_affected())
}
