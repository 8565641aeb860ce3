// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for tag rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::value_objects::{path_name, TagPath};
use tagstore_domain::{NamespaceId, Tag, TagId, TagstoreError, UserId};

use super::{db_err, placeholders};

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Result<Tag, TagstoreError> {
    let object_id: String = row.try_get("object_id").map_err(db_err)?;
    Ok(Tag {
        id: row.try_get("id").map_err(db_err)?,
        object_id: Uuid::parse_str(&object_id)
            .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?,
        namespace_id: row.try_get("namespace_id").map_err(db_err)?,
        creator_id: row.try_get("creator_id").map_err(db_err)?,
        path: row.try_get("path").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        creation_time: row
            .try_get::<DateTime<Utc>, _>("creation_time")
            .map_err(db_err)?,
    })
}

/// Creates a new tag row under a namespace.
///
/// # Errors
/// Returns `MalformedPath` for invalid paths and `DuplicatePath` when the
/// path already names a tag.
pub async fn create_tag(
    conn: &mut SqliteConnection,
    creator_id: UserId,
    namespace_id: NamespaceId,
    object_id: Uuid,
    path: &str,
) -> Result<Tag, TagstoreError> {
    let path = TagPath::parse(path)?;
    let name = path_name(path.as_str()).to_string();
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO tags \
         (object_id, namespace_id, creator_id, path, name, creation_time) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(object_id.to_string())
    .bind(namespace_id)
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

    Ok(Tag {
        id,
        object_id,
        namespace_id,
        creator_id,
        path: path.into_string(),
        name,
        creation_time: now,
    })
}

/// Gets tags filtered by path set and/or object-ID set; unfiltered when
/// both are `None`.
pub async fn get_tags(
    conn: &mut SqliteConnection,
    paths: Option<&[String]>,
    object_ids: Option<&[Uuid]>,
) -> Result<Vec<Tag>, TagstoreError> {
    let mut sql = "SELECT * FROM tags".to_string();
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
    rows.iter().map(row_to_tag).collect()
}

/// Maps tag paths to their row IDs.
pub async fn get_tag_ids(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<HashMap<String, TagId>, TagstoreError> {
    let tags = get_tags(conn, Some(paths), None).await?;
    Ok(tags.into_iter().map(|tag| (tag.path, tag.id)).collect())
}

/// Gets the direct child tags of the specified namespace paths.
pub async fn get_child_tags(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<Vec<Tag>, TagstoreError> {
    if paths.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT * FROM tags WHERE namespace_id IN \
         (SELECT id FROM namespaces WHERE path IN ({}))",
        placeholders(paths.len())
    );
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter().map(row_to_tag).collect()
}

/// Deletes the tags matching `paths`.  Permission rows, tag values and
/// opaque links go with them through the schema cascades.
pub async fn delete_tags(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<u64, TagstoreError> {
    if paths.is_empty() {
        return Ok(0);
    }
    let sql = format!("DELETE FROM tags WHERE path IN ({})", placeholders(paths.len()));
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
    use crate::infrastructure::repositories::namespaces::create_namespace;
    use crate::infrastructure::repositories::schema::initialize_database;
    use crate::infrastructure::repositories::users::create_user;
    use tagstore_domain::Role;

    async fn setup() -> (sqlx::SqlitePool, UserId, NamespaceId) {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        let namespace = create_namespace(&mut conn, user.id, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        drop(conn);
        (pool, user.id, namespace.id)
    }

    #[tokio::test]
    async fn create_and_lookup_ids() {
        let (pool, alice, namespace) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let tag = create_tag(&mut conn, alice, namespace, Uuid::new_v4(), "alice/rating")
            .await
            .unwrap();
        assert_eq!(tag.name, "rating");

        let ids = get_tag_ids(&mut conn, &["alice/rating".to_string()])
            .await
            .unwrap();
        assert_eq!(ids.get("alice/rating"), Some(&tag.id));
    }

    #[tokio::test]
    async fn duplicate_tag_paths_are_reported() {
        let (pool, alice, namespace) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_tag(&mut conn, alice, namespace, Uuid::new_v4(), "alice/rating")
            .await
            .unwrap();
        let result =
            create_tag(&mut conn, alice, namespace, Uuid::new_v4(), "alice/rating").await;
        assert!(matches!(result, Err(TagstoreError::DuplicatePath(_))));
    }

    #[tokio::test]
    async fn child_tags_by_namespace_path() {
        let (pool, alice, namespace) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        create_tag(&mut conn, alice, namespace, Uuid::new_v4(), "alice/rating")
            .await
            .unwrap();
        create_tag(&mut conn, alice, namespace, Uuid::new_v4(), "alice/review")
            .await
            .unwrap();

        let children = get_child_tags(&mut conn, &["alice".to_string()])
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        let none = get_child_tags(&mut conn, &["bob".to_string()]).await.unwrap();
        assert!(none.is_empty());
    }
}
