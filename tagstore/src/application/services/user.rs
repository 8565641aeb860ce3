// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # User Service
//!
//! Users are objects too: creating one mints the `@username` about value,
//! a root namespace whose path is the username, and the
//! `fluiddb/users/*` system tag values.  Passwords are hashed with
//! argon2; the hash never leaves this module.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::value_objects::{is_valid_username, namespace_about, user_about};
use tagstore_domain::{Role, TagValue, TagstoreError, User};

use crate::application::services::namespace::NamespaceApi;
use crate::application::services::object::ObjectApi;
use crate::application::services::value::TagValueApi;
use crate::application::services::{
    admin_user, USER_EMAIL_TAG, USER_NAME_TAG, USER_USERNAME_TAG,
};
use crate::infrastructure::repositories::{namespaces, users};

/// A batched user update: fields left `None` keep their value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: String,
    pub password: Option<String>,
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

fn hash_password(password: &str) -> Result<String, TagstoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TagstoreError::BadRequest(format!("unusable password: {}", e)))
}

/// The public API for users in the model layer.
pub struct UserApi;

impl UserApi {
    /// Creates a user service
    pub fn new() -> Self {
        Self
    }

    /// Creates users from `(username, password, fullname, email)` rows.
    ///
    /// Returns `(object id, username)` pairs.
    ///
    /// # Errors
    /// `InvalidUsername` for usernames failing the grammar; `BadRequest`
    /// when a username is taken.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String, String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        if values.is_empty() {
            return Err(TagstoreError::feature("can't create an empty list of users"));
        }
        for (username, _, _, _) in values {
            if !is_valid_username(username) {
                return Err(TagstoreError::InvalidUsername(username.clone()));
            }
        }

        let usernames: Vec<String> = values.iter().map(|(u, _, _, _)| u.clone()).collect();
        let existing = users::get_users(conn, Some(&usernames), None).await?;
        if let Some(user) = existing.first() {
            return Err(TagstoreError::bad_request(format!(
                "username already exists: {}",
                user.username
            )));
        }

        let admin = admin_user(conn).await?;
        let objects = ObjectApi::new(&admin);
        let mut system_values: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
        let mut result = Vec::new();
        for (username, password, fullname, email) in values {
            let about = user_about(username);
            let object_id = objects.create(conn, Some(about.as_str())).await?;
            let password_hash = hash_password(password)?;
            let user = users::create_user(
                conn,
                object_id,
                username,
                &password_hash,
                fullname,
                email,
                Role::User,
            )
            .await?;

            // The user's root namespace carries their username as path.
            NamespaceApi::new(&user)
                .create(
                    conn,
                    &[(username.clone(), namespace_about(username))],
                )
                .await?;

            system_values.insert(
                object_id,
                HashMap::from([
                    (
                        USER_USERNAME_TAG.to_string(),
                        TagValue::Text(username.clone()),
                    ),
                    (USER_NAME_TAG.to_string(), TagValue::Text(fullname.clone())),
                    (USER_EMAIL_TAG.to_string(), TagValue::Text(email.clone())),
                ]),
            );
            result.push((object_id, username.clone()));
        }

        TagValueApi::new(&admin)
            .set_known(conn, &system_values)
            .await?;
        Ok(result)
    }

    /// Gets a user by username.
    ///
    /// # Errors
    /// `UnknownUser` if the username does not exist.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<User, TagstoreError> {
        users::get_user(conn, username)
            .await?
            .ok_or_else(|| TagstoreError::UnknownUser(vec![username.to_string()]))
    }

    /// Updates users; absent fields keep their stored value.
    ///
    /// Returns `(object id, username)` pairs for the users updated.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        updates: &[UserUpdate],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let admin = admin_user(conn).await?;
        let mut system_values: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
        let mut result = Vec::new();
        for update in updates {
            let user = self.get(conn, &update.username).await?;
            let password_hash = update
                .password
                .as_deref()
                .map(hash_password)
                .transpose()?;
            users::update_user(
                conn,
                &update.username,
                password_hash.as_deref(),
                update.fullname.as_deref(),
                update.email.as_deref(),
                update.role,
            )
            .await?;

            let mut values = HashMap::new();
            if let Some(fullname) = &update.fullname {
                values.insert(USER_NAME_TAG.to_string(), TagValue::Text(fullname.clone()));
            }
            if let Some(email) = &update.email {
                values.insert(USER_EMAIL_TAG.to_string(), TagValue::Text(email.clone()));
            }
            if !values.is_empty() {
                system_values.insert(user.object_id, values);
            }
            result.push((user.object_id, update.username.clone()));
        }
        if !system_values.is_empty() {
            TagValueApi::new(&admin)
                .set_known(conn, &system_values)
                .await?;
        }
        Ok(result)
    }

    /// Deletes users and their empty root namespaces.  The `@username`
    /// about value survives on the object.
    ///
    /// # Errors
    /// `UnknownUser` for missing usernames; `NamespaceNotEmpty` if a root
    /// namespace still has children.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        usernames: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        if usernames.is_empty() {
            return Err(TagstoreError::feature("can't delete an empty list of users"));
        }
        let admin = admin_user(conn).await?;
        let mut result = Vec::new();
        for username in usernames {
            let user = self.get(conn, username).await?;

            let root = namespaces::get_namespaces(conn, Some(&[username.clone()]), None).await?;
            if !root.is_empty() {
                NamespaceApi::new(&admin)
                    .delete(conn, &[username.clone()])
                    .await?;
            }

            let system_pairs = vec![
                (user.object_id, USER_USERNAME_TAG.to_string()),
                (user.object_id, USER_NAME_TAG.to_string()),
                (user.object_id, USER_EMAIL_TAG.to_string()),
            ];
            TagValueApi::new(&admin).delete(conn, &system_pairs).await?;

            users::delete_user(conn, username).await?;
            result.push((user.object_id, username.clone()));
        }
        Ok(result)
    }
}

impl Default for UserApi {
    fn default() -> Self {
        Self::new()
    }
}
