// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The dirty-object log and the index-feed aggregation.
//!
//! Every tag-value mutation appends the affected object IDs here inside the
//! mutating transaction; the index synchroniser consumes the log after
//! commit.  Consumed rows are marked indexed rather than deleted so a run
//! can be replayed.

use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::TagstoreError;

use super::{db_err, placeholders};

/// Appends object IDs to the dirty-object log.
pub async fn touch_objects(
    conn: &mut SqliteConnection,
    object_ids: &[Uuid],
) -> Result<(), TagstoreError> {
    for object_id in object_ids {
        sqlx::query("INSERT INTO dirty_objects (object_id, update_time) VALUES (?, ?)")
            .bind(object_id.to_string())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

/// Gets the distinct object IDs with un-indexed dirty rows.
pub async fn get_dirty_object_ids(
    conn: &mut SqliteConnection,
) -> Result<Vec<Uuid>, TagstoreError> {
    let rows = sqlx::query("SELECT DISTINCT object_id FROM dirty_objects WHERE indexed = 0")
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let object_id: String = row.try_get("object_id").map_err(db_err)?;
            Uuid::parse_str(&object_id)
                .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))
        })
        .collect()
}

/// Marks the dirty rows for the given objects as indexed.
pub async fn mark_objects_indexed(
    conn: &mut SqliteConnection,
    object_ids: &[Uuid],
) -> Result<u64, TagstoreError> {
    if object_ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE dirty_objects SET indexed = 1 \
         WHERE indexed = 0 AND object_id IN ({})",
        placeholders(object_ids.len())
    );
    let mut query = sqlx::query(&sql);
    for object_id in object_ids {
        query = query.bind(object_id.to_string());
    }
    let result = query.execute(&mut *conn).await.map_err(db_err)?;
    Ok(result.rows_affected())
}

/// The aggregation feeding the index: `(object, path, value)` rows ordered
/// by object, for all objects (`clean`) or only those in the un-indexed
/// part of the dirty log.
///
/// Opaque metadata rows gain a `file-id` field from their opaque link so
/// the index can store the content hash.
pub async fn get_object_field_values(
    conn: &mut SqliteConnection,
    clean: bool,
) -> Result<Vec<(Uuid, String, serde_json::Value)>, TagstoreError> {
    let mut sql = "SELECT v.object_id AS object_id, t.path AS path, v.value AS value, \
                   l.file_id AS file_id \
                   FROM tag_values v \
                   JOIN tags t ON v.tag_id = t.id \
                   LEFT JOIN opaque_value_link l ON l.value_id = v.id"
        .to_string();
    if !clean {
        sql.push_str(
            " WHERE v.object_id IN \
             (SELECT object_id FROM dirty_objects WHERE indexed = 0)",
        );
    }
    sql.push_str(" ORDER BY v.object_id");

    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;

    let mut results = Vec::with_capacity(rows.len());
    for row in &rows {
        let object_id: String = row.try_get("object_id").map_err(db_err)?;
        let object_id = Uuid::parse_str(&object_id)
            .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?;
        let path: String = row.try_get("path").map_err(db_err)?;
        let value_json: String = row.try_get("value").map_err(db_err)?;
        let mut value: serde_json::Value = serde_json::from_str(&value_json)?;
        if let Some(fields) = value.as_object_mut() {
            let file_id: Option<String> = row.try_get("file_id").map_err(db_err)?;
            if let Some(file_id) = file_id {
                fields.insert("file-id".to_string(), serde_json::Value::String(file_id));
            }
        }
        results.push((object_id, path, value));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::namespaces::create_namespace;
    use crate::infrastructure::repositories::schema::initialize_database;
    use crate::infrastructure::repositories::tags::create_tag;
    use crate::infrastructure::repositories::users::create_user;
    use crate::infrastructure::repositories::values::{create_opaque_value, create_tag_value};
    use serde_json::json;
    use tagstore_domain::Role;

    #[tokio::test]
    async fn dirty_log_round_trip() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        touch_objects(&mut conn, &[first, second, first]).await.unwrap();

        let mut dirty = get_dirty_object_ids(&mut conn).await.unwrap();
        dirty.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(dirty, expected);

        // Marking keeps the rows but takes them out of the delta feed.
        mark_objects_indexed(&mut conn, &[first, second]).await.unwrap();
        assert!(get_dirty_object_ids(&mut conn).await.unwrap().is_empty());
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dirty_objects")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn aggregation_feeds_clean_and_delta_builds() {
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

        let dirty_object = Uuid::new_v4();
        let clean_object = Uuid::new_v4();
        create_tag_value(&mut conn, user.id, tag.id, dirty_object, &json!(5))
            .await
            .unwrap();
        create_tag_value(&mut conn, user.id, tag.id, clean_object, &json!(7))
            .await
            .unwrap();
        touch_objects(&mut conn, &[dirty_object]).await.unwrap();

        let all = get_object_field_values(&mut conn, true).await.unwrap();
        assert_eq!(all.len(), 2);

        let delta = get_object_field_values(&mut conn, false).await.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].0, dirty_object);
        assert_eq!(delta[0].1, "alice/rating");
        assert_eq!(delta[0].2, json!(5));
    }

    #[tokio::test]
    async fn aggregation_adds_file_ids_to_opaque_values() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        let namespace = create_namespace(&mut conn, user.id, Uuid::new_v4(), "alice", None)
            .await
            .unwrap();
        let tag = create_tag(&mut conn, user.id, namespace.id, Uuid::new_v4(), "alice/cover")
            .await
            .unwrap();

        let object_id = Uuid::new_v4();
        let value_id = create_tag_value(
            &mut conn,
            user.id,
            tag.id,
            object_id,
            &json!({"mime-type": "text/plain", "size": 5}),
        )
        .await
        .unwrap();
        let file_id = create_opaque_value(&mut conn, value_id, b"hello").await.unwrap();

        let all = get_object_field_values(&mut conn, true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].2["file-id"], json!(file_id));
        assert_eq!(all[0].2["mime-type"], json!("text/plain"));
    }
}
