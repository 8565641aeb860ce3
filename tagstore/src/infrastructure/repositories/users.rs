// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Data access for user rows.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use tagstore_domain::{Role, TagstoreError, User, UserId};

use super::{db_err, placeholders};

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, TagstoreError> {
    let object_id: String = row.try_get("object_id").map_err(db_err)?;
    let role_id: i64 = row.try_get("role").map_err(db_err)?;
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        object_id: Uuid::parse_str(&object_id)
            .map_err(|e| TagstoreError::DatabaseError(format!("bad object id: {}", e)))?,
        username: row.try_get("username").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        fullname: row.try_get("fullname").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        role: Role::from_id(role_id)
            .ok_or_else(|| TagstoreError::DatabaseError(format!("bad role id: {}", role_id)))?,
        creation_time: row
            .try_get::<DateTime<Utc>, _>("creation_time")
            .map_err(db_err)?,
    })
}

/// Creates a new user row.
#[allow(clippy::too_many_arguments)]
pub async fn create_user(
    conn: &mut SqliteConnection,
    object_id: Uuid,
    username: &str,
    password_hash: &str,
    fullname: &str,
    email: &str,
    role: Role,
) -> Result<User, TagstoreError> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO users \
         (object_id, username, password_hash, fullname, email, role, creation_time) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(object_id.to_string())
    .bind(username)
    .bind(password_hash)
    .bind(fullname)
    .bind(email)
    .bind(role.id())
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?
    .last_insert_rowid();

    Ok(User {
        id,
        object_id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        fullname: fullname.to_string(),
        email: email.to_string(),
        role,
        creation_time: now,
    })
}

/// Gets users filtered by username set and/or id set; unfiltered when both
/// are `None`.
pub async fn get_users(
    conn: &mut SqliteConnection,
    usernames: Option<&[String]>,
    ids: Option<&[UserId]>,
) -> Result<Vec<User>, TagstoreError> {
    let mut sql = "SELECT * FROM users".to_string();
    let mut clauses = Vec::new();
    if let Some(usernames) = usernames {
        if usernames.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!("username IN ({})", placeholders(usernames.len())));
    }
    if let Some(ids) = ids {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        clauses.push(format!("id IN ({})", placeholders(ids.len())));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut query = sqlx::query(&sql);
    if let Some(usernames) = usernames {
        for username in usernames {
            query = query.bind(username);
        }
    }
    if let Some(ids) = ids {
        for id in ids {
            query = query.bind(id);
        }
    }

    let rows = query.fetch_all(&mut *conn).await.map_err(db_err)?;
    rows.iter().map(row_to_user).collect()
}

/// Gets a single user by username.
pub async fn get_user(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, TagstoreError> {
    let row = sqlx::query("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    row.as_ref().map(row_to_user).transpose()
}

/// Updates the mutable fields of a user row.
pub async fn update_user(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: Option<&str>,
    fullname: Option<&str>,
    email: Option<&str>,
    role: Option<Role>,
) -> Result<u64, TagstoreError> {
    let mut sets = Vec::new();
    if password_hash.is_some() {
        sets.push("password_hash = ?");
    }
    if fullname.is_some() {
        sets.push("fullname = ?");
    }
    if email.is_some() {
        sets.push("email = ?");
    }
    if role.is_some() {
        sets.push("role = ?");
    }
    if sets.is_empty() {
        return Ok(0);
    }

    let sql = format!("UPDATE users SET {} WHERE username = ?", sets.join(", "));
    let mut query = sqlx::query(&sql);
    if let Some(password_hash) = password_hash {
        query = query.bind(password_hash);
    }
    if let Some(fullname) = fullname {
        query = query.bind(fullname);
    }
    if let Some(email) = email {
        query = query.bind(email);
    }
    if let Some(role) = role {
        query = query.bind(role.id());
    }
    let result = query
        .bind(username)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected())
}

/// Deletes a user row.
pub async fn delete_user(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<u64, TagstoreError> {
    let result = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(username)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::initialize_database;

    #[tokio::test]
    async fn create_and_get_users() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let alice = create_user(
            &mut conn,
            Uuid::new_v4(),
            "alice",
            "hash",
            "Alice",
            "alice@example.com",
            Role::User,
        )
        .await
        .unwrap();
        assert!(alice.id > 0);

        let loaded = get_user(&mut conn, "alice").await.unwrap().unwrap();
        assert_eq!(loaded, alice);
        assert!(get_user(&mut conn, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        let duplicate =
            create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn filters_compose() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();
        create_user(&mut conn, Uuid::new_v4(), "bob", "h", "B", "b@e.com", Role::User)
            .await
            .unwrap();

        let users = get_users(&mut conn, Some(&["alice".to_string()]), None)
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        let users = get_users(&mut conn, None, Some(&[alice.id]))
            .await
            .unwrap();
        assert_eq!(users[0].username, "alice");
        let users = get_users(&mut conn, None, None).await.unwrap();
        assert_eq!(users.len(), 2);
        let users = get_users(&mut conn, Some(&[]), None).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_requested_fields() {
        let pool = initialize_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        create_user(&mut conn, Uuid::new_v4(), "alice", "h", "A", "a@e.com", Role::User)
            .await
            .unwrap();

        let affected = update_user(&mut conn, "alice", None, Some("Alice Q"), None, None)
            .await
            .unwrap();
        assert_eq!(affected, 1);
        let user = get_user(&mut conn, "alice").await.unwrap().unwrap();
        assert_eq!(user.fullname, "Alice Q");
        assert_eq!(user.email, "a@e.com");
    }
}
