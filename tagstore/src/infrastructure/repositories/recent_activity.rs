// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for recent-activity listings.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::entities::ActivityEntry;
use tagstore_domain::TagstoreError;

use super::{db_err, placeholders};

/// Default number of entries in a recent-activity listing.
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 20;

/// Gets information about the most recent tag values, filtered by object
/// IDs and/or creator usernames, newest first.
pub async fn get_recent_activity(
    conn: &mut SqliteConnection,
    object_ids: Option<&[Uuid]>,
    usernames: Option<&[String]>,
    limit: i64,
) -> Result<Vec<ActivityEntry>, TagstoreError> {
    let mut conditions = Vec::new();
    if let Some(object_ids) = object_ids {
        if !object_ids.is_empty() {
            conditions.push(format!(
                "v.object_id IN ({})",
                placeholders(object_ids.len())
            ));
        }
    }
    if let Some(usernames) = usernames {
        if !usernames.is_empty() {
            conditions.push(format!("u.username IN ({})", placeholders(usernames.len())));
        }
    }
    if conditions.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT t.path AS path, v.object_id AS object_id, a.value AS about, \
         v.value AS value, u.username AS username, v.creation_time AS creation_time \
         FROM tag_values v \
         JOIN tags t ON v.tag_id = t.id \
         JOIN users u ON v.creator_id = u.id \
         LEFT JOIN about_tag_values a ON a.object_id = v.object_id \
         WHERE {} ORDER BY v.creation_time DESC, v.id DESC LIMIT ?",
        conditions.join(" OR ")
    );

    let mut query = sqlx::query(&sql);
    if let Some(object_ids) = object_ids {
        for object_id in object_ids {
            query = query.bind(object_id.to_string());
        }
    }
    if let Some(usernames) = usernames {
        for username in usernames {
            query = query.bind(username);
        }
    }
    query = query.bind(limit);

    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter()
        .map(|row| {
            let object_id: String = row.try_get("object_id").map_err(db_err)?;
            let value_json: String = row.try_get("value").map_err(db_err)?;
            let mut value: serde_json::Value = serde_json::from_str(&value_json)?;
            // Listings report opaque values as metadata, never payloads.
            if let Some(fields) = value.as_object_mut() {
                if let Some(mime_type) = fields.remove("mime-type") {
                    let size = fields.remove("size").unwrap_or(serde_json::Value::Null);
                    fields.clear();
                    fields.insert("value-type".to_string(), mime_type);
                    fields.insert("size".to_string(), size);
                }
            }
            Ok(ActivityEntry {
                tag_path: row.try_get("path").map_err(db_err)?,
                object_id: Uuid::parse_str(&object_id)
                    .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?,
                about: row.try_get("about").map_err(db_err)?,
                value,
                username: row.try_get("username").map_err(db_err)?,
                creation_time: row
                    .try_get::<DateTime<Utc>, _>("creation_time")
                    .map_err(db_err)?,
            })
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
    use crate::infrastructure::repositories::values::{
        create_about_tag_value, create_tag_value,
    };
    use serde_json::json;
    use tagstore_domain::Role;

    #[tokio::test]
    async fn listings_join_about_values_and_sort_newest_first() {
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
        let other = create_tag(&mut conn, user.id, namespace.id, Uuid::new_v4(), "alice/note")
            .await
            .unwrap();

        let object_id = Uuid::new_v4();
        create_about_tag_value(&mut conn, object_id, "A Book", "a book")
            .await
            .unwrap();
        create_tag_value(&mut conn, user.id, tag.id, object_id, &json!(5))
            .await
            .unwrap();
        create_tag_value(&mut conn, user.id, other.id, object_id, &json!("fine"))
            .await
            .unwrap();

        let entries = get_recent_activity(&mut conn, Some(&[object_id]), None, 20)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tag_path, "alice/note");
        assert_eq!(entries[0].about.as_deref(), Some("A Book"));
        assert_eq!(entries[1].value, json!(5));

        let by_user = get_recent_activity(&mut conn, None, Some(&["alice".to_string()]), 1)
            .await
            .unwrap();
        assert_eq!(by_user.len(), 1);

        let empty = get_recent_activity(&mut conn, None, None, 20).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn opaque_values_are_reported_as_metadata() {
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
        create_tag_value(
            &mut conn,
            user.id,
            tag.id,
            object_id,
            &json!({"mime-type": "image/png", "size": 100}),
        )
        .await
        .unwrap();

        let entries = get_recent_activity(&mut conn, Some(&[object_id]), None, 20)
            .await
            .unwrap();
        assert_eq!(
            entries[0].value,
            json!({"value-type": "image/png", "size": 100})
        );
    }
}
