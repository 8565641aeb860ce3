// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for tag values, opaque payloads and about values.
//!
//! Tag-value rows store the typed value as JSON.  Opaque payloads are
//! content-addressed by SHA-256 in `opaque_values` and joined through
//! `opaque_value_link`; several values sharing the same content share one
//! opaque row, and the row survives until its last link is gone.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::{TagId, TagstoreError, UserId};

use super::{db_err, placeholders};

/// A raw tag-value row, value still in its stored JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct TagValueRow {
    pub id: i64,
    pub creator_id: UserId,
    pub tag_id: TagId,
    pub object_id: Uuid,
    pub value: serde_json::Value,
    pub creation_time: DateTime<Utc>,
}

fn row_to_value(row: &sqlx::sqlite::SqliteRow) -> Result<TagValueRow, TagstoreError> {
    let object_id: String = row.try_get("object_id").map_err(db_err)?;
    let value_json: String = row.try_get("value").map_err(db_err)?;
    Ok(TagValueRow {
        id: row.try_get("id").map_err(db_err)?,
        creator_id: row.try_get("creator_id").map_err(db_err)?,
        tag_id: row.try_get("tag_id").map_err(db_err)?,
        object_id: Uuid::parse_str(&object_id)
            .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?,
        value: serde_json::from_str(&value_json)?,
        creation_time: row
            .try_get::<DateTime<Utc>, _>("creation_time")
            .map_err(db_err)?,
    })
}

fn pair_clause(count: usize) -> String {
    let mut clause = String::new();
    for index in 0..count {
        if index > 0 {
            clause.push_str(" OR ");
        }
        clause.push_str("(object_id = ? AND tag_id = ?)");
    }
    clause
}

/// Inserts a tag value and returns its row ID.
pub async fn create_tag_value(
    conn: &mut SqliteConnection,
    creator_id: UserId,
    tag_id: TagId,
    object_id: Uuid,
    value: &serde_json::Value,
) -> Result<i64, TagstoreError> {
    let result = sqlx::query(
        "INSERT INTO tag_values (creator_id, tag_id, object_id, value, creation_time) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(creator_id)
    .bind(tag_id)
    .bind(object_id.to_string())
    .bind(serde_json::to_string(value)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(result.last_insert_rowid())
}

/// Gets tag values for `(object, tag)` pairs.
pub async fn get_tag_values(
    conn: &mut SqliteConnection,
    pairs: &[(Uuid, TagId)],
) -> Result<Vec<TagValueRow>, TagstoreError> {
    if pairs.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!("SELECT * FROM tag_values WHERE {}", pair_clause(pairs.len()));
    let mut query = sqlx::query(&sql);
    for (object_id, tag_id) in pairs {
        query = query.bind(object_id.to_string()).bind(tag_id);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter().map(row_to_value).collect()
}

/// Deletes tag values for `(object, tag)` pairs; opaque links cascade.
pub async fn delete_tag_values(
    conn: &mut SqliteConnection,
    pairs: &[(Uuid, TagId)],
) -> Result<u64, TagstoreError> {
    if pairs.is_empty() {
        return Ok(0);
    }
    let sql = format!("DELETE FROM tag_values WHERE {}", pair_clause(pairs.len()));
    let mut query = sqlx::query(&sql);
    for (object_id, tag_id) in pairs {
        query = query.bind(object_id.to_string()).bind(tag_id);
    }
    let result = query.execute(&mut *conn).await.map_err(db_err)?;
    Ok(result.rows_affected())
}

/// Stores an opaque payload for a tag value, sharing content by SHA-256,
/// and returns the file ID.
pub async fn create_opaque_value(
    conn: &mut SqliteConnection,
    value_id: i64,
    contents: &[u8],
) -> Result<String, TagstoreError> {
    let file_id = hex::encode(Sha256::digest(contents));

    let existing: Option<String> =
        sqlx::query_scalar("SELECT file_id FROM opaque_values WHERE file_id = ?")
            .bind(&file_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
    if existing.is_none() {
        sqlx::query("INSERT INTO opaque_values (file_id, content) VALUES (?, ?)")
            .bind(&file_id)
            .bind(contents)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }

    sqlx::query("INSERT INTO opaque_value_link (value_id, file_id) VALUES (?, ?)")
        .bind(value_id)
        .bind(&file_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(file_id)
}

/// Gets the opaque payload linked to a tag value, if any.
pub async fn get_opaque_content(
    conn: &mut SqliteConnection,
    value_id: i64,
) -> Result<Option<Vec<u8>>, TagstoreError> {
    sqlx::query_scalar(
        "SELECT o.content FROM opaque_values o \
         JOIN opaque_value_link l ON o.file_id = l.file_id \
         WHERE l.value_id = ?",
    )
    .bind(value_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)
}

/// Removes opaque rows that no longer have any links.
pub async fn prune_orphan_opaque_values(
    conn: &mut SqliteConnection,
) -> Result<u64, TagstoreError> {
    let result = sqlx::query(
        "DELETE FROM opaque_values WHERE file_id NOT IN \
         (SELECT file_id FROM opaque_value_link)",
    )
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(result.rows_affected())
}

/// Gets `(path, row, creator username)` triples filtered by object-ID set
/// and/or path set, optionally created before a point in time.
pub async fn get_values_with_paths(
    conn: &mut SqliteConnection,
    object_ids: Option<&[Uuid]>,
    paths: Option<&[String]>,
    created_before: Option<DateTime<Utc>>,
) -> Result<Vec<(String, TagValueRow, String)>, TagstoreError> {
    let mut sql = "SELECT t.path AS path, u.username AS username, v.* \
                   FROM tag_values v \
                   JOIN tags t ON v.tag_id = t.id \
                   JOIN users u ON v.creator_id = u.id"
        .to_string();
    let mut clauses = Vec::new();
    if let Some(object_ids) = object_ids {
        if object_ids.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!(
            "v.object_id IN ({})",
            placeholders(object_ids.len())
        ));
    }
    if let Some(paths) = paths {
        if paths.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!("t.path IN ({})", placeholders(paths.len())));
    }
    if created_before.is_some() {
        clauses.push("v.creation_time < ?".to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut query = sqlx::query(&sql);
    if let Some(object_ids) = object_ids {
        for object_id in object_ids {
            query = query.bind(object_id.to_string());
        }
    }
    if let Some(paths) = paths {
        for path in paths {
            query = query.bind(path);
        }
    }
    if let Some(created_before) = created_before {
        query = query.bind(created_before);
    }

    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let path: String = row.try_get("path").map_err(db_err)?;
            let username: String = row.try_get("username").map_err(db_err)?;
            Ok((path, row_to_value(row)?, username))
        })
        .collect()
}

/// Gets `(path, object_id)` pairs for the specified objects.
pub async fn get_tag_paths_and_object_ids(
    conn: &mut SqliteConnection,
    object_ids: &[Uuid],
) -> Result<Vec<(String, Uuid)>, TagstoreError> {
    if object_ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT t.path AS path, v.object_id AS object_id FROM tag_values v \
         JOIN tags t ON v.tag_id = t.id WHERE v.object_id IN ({})",
        placeholders(object_ids.len())
    );
    let mut query = sqlx::query(&sql);
    for object_id in object_ids {
        query = query.bind(object_id.to_string());
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let path: String = row.try_get("path").map_err(db_err)?;
            let object_id: String = row.try_get("object_id").map_err(db_err)?;
            let object_id = Uuid::parse_str(&object_id)
                .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?;
            Ok((path, object_id))
        })
        .collect()
}

/// Gets the distinct tag paths present on the specified objects.
pub async fn get_tag_paths_for_objects(
    conn: &mut SqliteConnection,
    object_ids: &[Uuid],
) -> Result<Vec<String>, TagstoreError> {
    if object_ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT DISTINCT t.path AS path FROM tag_values v \
         JOIN tags t ON v.tag_id = t.id WHERE v.object_id IN ({})",
        placeholders(object_ids.len())
    );
    let mut query = sqlx::query(&sql);
    for object_id in object_ids {
        query = query.bind(object_id.to_string());
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("path").map_err(db_err))
        .collect()
}

/// Gets the object IDs carrying values for any of the specified paths,
/// optionally capped.
pub async fn get_object_ids_for_paths(
    conn: &mut SqliteConnection,
    paths: &[String],
    limit: Option<i64>,
) -> Result<Vec<Uuid>, TagstoreError> {
    if paths.is_empty() {
        return Ok(vec![]);
    }
    let mut sql = format!(
        "SELECT v.object_id AS object_id FROM tag_values v \
         JOIN tags t ON v.tag_id = t.id WHERE t.path IN ({})",
        placeholders(paths.len())
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }
    let mut query = sqlx::query(&sql);
    for path in paths {
        query = query.bind(path);
    }
    if let Some(limit) = limit {
        query = query.bind(limit);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let object_id: String = row.try_get("object_id").map_err(db_err)?;
            Uuid::parse_str(&object_id)
                .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))
        })
        .collect()
}

/// Creates an about value row for an object.
pub async fn create_about_tag_value(
    conn: &mut SqliteConnection,
    object_id: Uuid,
    value: &str,
    folded_value: &str,
) -> Result<(), TagstoreError> {
    sqlx::query("INSERT INTO about_tag_values (object_id, value, folded_value) VALUES (?, ?, ?)")
        .bind(object_id.to_string())
        .bind(value)
        .bind(folded_value)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Gets `(stored value, folded value, object id)` rows matching the folded
/// forms.
pub async fn get_about_tag_values(
    conn: &mut SqliteConnection,
    folded_values: &[String],
) -> Result<Vec<(String, String, Uuid)>, TagstoreError> {
    if folded_values.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT value, folded_value, object_id FROM about_tag_values \
         WHERE folded_value IN ({})",
        placeholders(folded_values.len())
    );
    let mut query = sqlx::query(&sql);
    for folded in folded_values {
        query = query.bind(folded);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let value: String = row.try_get("value").map_err(db_err)?;
            let folded: String = row.try_get("folded_value").map_err(db_err)?;
            let object_id: String = row.try_get("object_id").map_err(db_err)?;
            let object_id = Uuid::parse_str(&object_id)
                .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?;
            Ok((value, folded, object_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::namespaces::create_namespace;
    use crate::infrastructure::repositories::schema::initialize_database;
    use crate::infrastructure::repositories::tags::create_tag;
    use crate::infrastructure::repositories::users::create_user;
    use serde_json::json;
    use tagstore_domain::Role;

    struct Fixture {
        pool: sqlx::SqlitePool,
        user_id: UserId,
        tag_id: TagId,
    }

    async fn setup() -> Fixture {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        let namespace = create_namespace(&mut conn, user.id, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        let tag = create_tag(&mut conn, user.id, namespace.id, Uuid::new_v4(), "alice/rating")
            .await
            .unwrap();
        Fixture {
            pool,
            user_id: user.id,
            tag_id: tag.id,
        }
    }

    #[tokio::test]
    async fn values_round_trip_by_pair() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let object_id = Uuid::new_v4();
        create_tag_value(&mut conn, fixture.user_id, fixture.tag_id, object_id, &json!(5))
            .await
            .unwrap();

        let rows = get_tag_values(&mut conn, &[(object_id, fixture.tag_id)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, json!(5));

        let deleted = delete_tag_values(&mut conn, &[(object_id, fixture.tag_id)])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(get_tag_values(&mut conn, &[(object_id, fixture.tag_id)])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn object_tag_pairs_are_unique() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let object_id = Uuid::new_v4();
        create_tag_value(&mut conn, fixture.user_id, fixture.tag_id, object_id, &json!(1))
            .await
            .unwrap();
        let duplicate =
            create_tag_value(&mut conn, fixture.user_id, fixture.tag_id, object_id, &json!(2))
                .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn opaque_values_share_content_by_hash() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let first_object = Uuid::new_v4();
        let second_object = Uuid::new_v4();
        let first = create_tag_value(
            &mut conn,
            fixture.user_id,
            fixture.tag_id,
            first_object,
            &json!({"mime-type": "text/plain", "size": 5}),
        )
        .await
        .unwrap();
        let second = create_tag_value(
            &mut conn,
            fixture.user_id,
            fixture.tag_id,
            second_object,
            &json!({"mime-type": "text/plain", "size": 5}),
        )
        .await
        .unwrap();

        let first_file = create_opaque_value(&mut conn, first, b"hello").await.unwrap();
        let second_file = create_opaque_value(&mut conn, second, b"hello").await.unwrap();
        assert_eq!(first_file, second_file);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM opaque_values")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Deleting one value drops only its link; the shared row survives.
        delete_tag_values(&mut conn, &[(first_object, fixture.tag_id)])
            .await
            .unwrap();
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM opaque_value_link")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(links, 1);
        assert_eq!(
            get_opaque_content(&mut conn, second).await.unwrap(),
            Some(b"hello".to_vec())
        );

        // The orphan sweep only removes rows with no remaining links.
        assert_eq!(prune_orphan_opaque_values(&mut conn).await.unwrap(), 0);
        delete_tag_values(&mut conn, &[(second_object, fixture.tag_id)])
            .await
            .unwrap();
        assert_eq!(prune_orphan_opaque_values(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn paths_and_objects_are_enumerable() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let object_id = Uuid::new_v4();
        create_tag_value(&mut conn, fixture.user_id, fixture.tag_id, object_id, &json!(5))
            .await
            .unwrap();

        let paths = get_tag_paths_for_objects(&mut conn, &[object_id]).await.unwrap();
        assert_eq!(paths, vec!["alice/rating".to_string()]);

        let pairs = get_tag_paths_and_object_ids(&mut conn, &[object_id])
            .await
            .unwrap();
        assert_eq!(pairs, vec![("alice/rating".to_string(), object_id)]);

        let objects =
            get_object_ids_for_paths(&mut conn, &["alice/rating".to_string()], Some(10))
                .await
                .unwrap();
        assert_eq!(objects, vec![object_id]);
    }

    #[tokio::test]
    async fn values_join_paths_and_creators() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let object_id = Uuid::new_v4();
        create_tag_value(&mut conn, fixture.user_id, fixture.tag_id, object_id, &json!("x"))
            .await
            .unwrap();

        let rows = get_values_with_paths(&mut conn, Some(&[object_id]), None, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let (path, row, username) = &rows[0];
        assert_eq!(path, "alice/rating");
        assert_eq!(username, "alice");
        assert_eq!(row.value, json!("x"));

        let filtered = get_values_with_paths(
            &mut conn,
            Some(&[object_id]),
            Some(&["other/path".to_string()]),
            None,
        )
        .await
        .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn about_values_are_unique_and_found_by_folded_form() {
        let fixture = setup().await;
        let mut conn = fixture.pool.acquire().await.unwrap();
        let object_id = Uuid::new_v4();
        create_about_tag_value(&mut conn, object_id, "Éric Serra", "éric serra")
            .await
            .unwrap();

        let rows = get_about_tag_values(&mut conn, &["éric serra".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "Éric Serra");
        assert_eq!(rows[0].2, object_id);

        let duplicate =
            create_about_tag_value(&mut conn, Uuid::new_v4(), "éric serra", "éric serra").await;
        assert!(duplicate.is_err());
    }
}
