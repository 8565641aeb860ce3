// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for namespace rows.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::value_objects::{path_name, TagPath};
use tagstore_domain::{Namespace, NamespaceId, TagstoreError, UserId};

use super::{db_err, placeholders};

pub(crate) fn row_to_namespace(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Namespace, TagstoreError> {
    let object_id: String = row.try_get("object_id").map_err(db_err)?;
    Ok(Namespace {
        id: row.try_get("id").map_err(db_err)?,
        object_id: Uuid::parse_str(&object_id)
            .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?,
        parent_id: row.try_get("parent_id").map_err(db_err)?,
        creator_id: row.try_get("creator_id").map_err(db_err)?,
        path: row.try_get("path").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        creation_time: row
            .try_get::<DateTime<Utc>, _>("creation_time")
            .map_err(db_err)?,
    })
}

/// Creates a new namespace row.
///
/// # Errors
/// Returns `MalformedPath` if the path fails the grammar, or
/// `DuplicatePath` if a namespace with this path already exists.
pub async fn create_namespace(
    conn: &mut SqliteConnection,
    creator_id: UserId,
    object_id: Uuid,
    path: &str,
    parent_id: Option<NamespaceId>,
) -> Result<Namespace, TagstoreError> {
    let path = TagPath::parse(path)?;
    let name = path_name(path.as_str()).to_string();
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO namespaces \
         (object_id, parent_id, creator_id, path, name, creation_time) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(object_id.to_string())
    .bind(parent_id)
    .bind(creator_id)
    .bind(path.as_str())
    .bind(&name)
    .bind(now)
    .execute(&mut *conn)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(TagstoreError::DuplicatePath(path.as_str().to_string()));
        }
        Err(e) => return Err(db_err(e)),
    };

    Ok(Namespace {
        id,
        object_id,
        parent_id,
        creator_id,
        path: path.into_string(),
        name,
        creation_time: now,
    })
}

/// Gets namespaces filtered by path set and/or object-ID set; unfiltered
/// when both are `None`.
pub async fn get_namespaces(
    conn: &mut SqliteConnection,
    paths: Option<&[String]>,
    object_ids: Option<&[Uuid]>,
) -> Result<Vec<Namespace>, TagstoreError> {
    let mut sql = "SELECT * FROM namespaces".to_string();
    let mut clauses = Vec::new();
    if let Some(paths) = paths {
        if paths.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!("path IN ({})", placeholders(paths.len())));
    }
    if let Some(object_ids) = object_ids {
        if object_ids.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!("object_id IN ({})", placeholders(object_ids.len())));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut query = sqlx::query(&sql);
    if let Some(paths) = paths {
        for path in paths {
            query = query.bind(path);
        }
    }
    if let Some(object_ids) = object_ids {
        for object_id in object_ids {
            query = query.bind(object_id.to_string());
        }
    }

    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter().map(row_to_namespace).collect()
}

/// Gets the direct child namespaces of the specified paths.
pub async fn get_child_namespaces(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<Vec<Namespace>, TagstoreError> {
    if paths.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT * FROM namespaces WHERE parent_id IN \
         (SELECT id FROM namespaces WHERE path IN ({}))",
        placeholders(paths.len())
    );
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter().map(row_to_namespace).collect()
}

/// Deletes the namespaces matching `paths`, cascading to their permission
/// rows.
pub async fn delete_namespaces(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<u64, TagstoreError> {
    if paths.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM namespaces WHERE path IN ({})",
        placeholders(paths.len())
    );
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    let result = query.execute(&mut *conn).await.map_err(db_err)?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::initialize_database;
    use crate::infrastructure::repositories::users::create_user;
    use tagstore_domain::Role;

    async fn setup() -> (sqlx::SqlitePool, UserId) {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        drop(conn);
        (pool, user.id)
    }

    #[tokio::test]
    async fn create_and_fetch_by_path() {
        let (pool, alice) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = create_namespace(&mut conn, alice, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        let child =
            create_namespace(&mut conn, alice, Uuid::new_v4(), "alice/books", Some(root.id))
                .await
                .unwrap();
        assert_eq!(child.name, "books");

        let namespaces = get_namespaces(&mut conn, Some(&["alice/books".to_string()]), None)
            .await
            .unwrap();
        assert_eq!(namespaces, vec![child]);
    }

    #[tokio::test]
    async fn duplicate_paths_are_reported() {
        let (pool, alice) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_namespace(&mut conn, alice, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        let result = create_namespace(&mut conn, alice, Uuid::new_v4(), "alice", None).await;
        assert!(matches!(result, Err(TagstoreError::DuplicatePath(_))));
    }

    #[tokio::test]
    async fn malformed_paths_are_rejected() {
        let (pool, alice) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let result =
            create_namespace(&mut conn, alice, Uuid::new_v4(), "Not A Path", None).await;
        assert!(matches!(result, Err(TagstoreError::MalformedPath(_))));
    }

    #[tokio::test]
    async fn children_are_found_by_parent_path() {
        let (pool, alice) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let root = create_namespace(&mut conn, alice, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        create_namespace(&mut conn, alice, Uuid::new_v4(), "alice/books", Some(root.id))
            .await
            .unwrap();
        create_namespace(&mut conn, alice, Uuid::new_v4(), "alice/films", Some(root.id))
            .await
            .unwrap();

        let children = get_child_namespaces(&mut conn, &["alice".to_string()])
            .await
            .unwrap();
        let mut names: Vec<_> = children.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["books", "films"]);
    }
}
