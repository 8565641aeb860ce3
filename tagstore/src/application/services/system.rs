// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Data
//!
//! Bootstraps the fixed points everything else hangs off: the `fluiddb`
//! superuser, the `anon` anonymous user, the system namespaces, and the
//! system tags (`fluiddb/about`, the `path`/`description` pairs, the user
//! metadata tags).  Idempotent: a database that already has the admin
//! user is left untouched.
//!
//! Entities are created through the repositories directly rather than the
//! model services, since the services assume the system tags exist.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::permission::{NAMESPACE_OPERATIONS, TAG_OPERATIONS};
use tagstore_domain::value_objects::{
    fold_about, namespace_about, parent_path, tag_about, user_about,
};
use tagstore_domain::{Operation, Permission, Policy, Role, TagValue, TagstoreError, User};

use crate::application::services::value::TagValueApi;
use crate::application::services::{
    ABOUT_TAG, ADMIN_USERNAME, ANON_USERNAME, NAMESPACE_DESCRIPTION_TAG, NAMESPACE_PATH_TAG,
    TAG_DESCRIPTION_TAG, TAG_PATH_TAG, USER_EMAIL_TAG, USER_NAME_TAG, USER_USERNAME_TAG,
};
use crate::infrastructure::repositories::{namespaces, permissions, tags, users, values};

const SYSTEM_NAMESPACES: &[(&str, &str)] = &[
    ("fluiddb", "The system namespace"),
    ("fluiddb/namespaces", "Holds namespace metadata"),
    ("fluiddb/tags", "Holds tag metadata"),
    ("fluiddb/users", "Holds user metadata"),
    ("anon", "The anonymous user's namespace"),
];

const SYSTEM_TAGS: &[(&str, &str)] = &[
    (ABOUT_TAG, "A globally unique description of an object"),
    (NAMESPACE_PATH_TAG, "The path of a namespace"),
    (NAMESPACE_DESCRIPTION_TAG, "The description of a namespace"),
    (TAG_PATH_TAG, "The path of a tag"),
    (TAG_DESCRIPTION_TAG, "The description of a tag"),
    (USER_USERNAME_TAG, "The username of a user"),
    (USER_NAME_TAG, "The full name of a user"),
    (USER_EMAIL_TAG, "The email address of a user"),
];

/// The users created by [`create_system_data`].
pub struct SystemData {
    pub admin: User,
    pub anon: User,
}

// System permissions carry empty exception lists: superusers pass on the
// role shortcut, so listing them would violate the exception-list rules.
fn system_namespace_permission() -> Permission {
    Permission::from_entries(NAMESPACE_OPERATIONS.iter().map(|&operation| {
        let policy = if operation == Operation::ListNamespace {
            Policy::Open
        } else {
            Policy::Closed
        };
        (operation, policy, vec![])
    }))
}

fn system_tag_permission() -> Permission {
    Permission::from_entries(TAG_OPERATIONS.iter().map(|&operation| {
        let policy = if operation == Operation::ReadTagValue {
            Policy::Open
        } else {
            Policy::Closed
        };
        (operation, policy, vec![])
    }))
}

/// Creates the system users, namespaces and tags if they are not already
/// present, and returns the system users.
pub async fn create_system_data(
    conn: &mut SqliteConnection,
) -> Result<SystemData, TagstoreError> {
    if let Some(admin) = users::get_user(conn, ADMIN_USERNAME).await? {
        let anon = users::get_user(conn, ANON_USERNAME)
            .await?
            .ok_or_else(|| TagstoreError::UnknownUser(vec![ANON_USERNAME.to_string()]))?;
        return Ok(SystemData { admin, anon });
    }

    // Password hash "!" is the locked-account convention: system users
    // never authenticate with a password.
    let admin = users::create_user(
        conn,
        Uuid::new_v4(),
        ADMIN_USERNAME,
        "!",
        "Fluid info",
        "fluiddb@example.com",
        Role::Superuser,
    )
    .await?;
    let anon = users::create_user(
        conn,
        Uuid::new_v4(),
        ANON_USERNAME,
        "!",
        "Anonymous",
        "anon@example.com",
        Role::Anonymous,
    )
    .await?;

    let mut namespace_ids = HashMap::new();
    for (path, _) in SYSTEM_NAMESPACES {
        let parent_id = parent_path(path).map(|parent| namespace_ids[parent]);
        let namespace =
            namespaces::create_namespace(conn, admin.id, Uuid::new_v4(), path, parent_id).await?;
        permissions::create_namespace_permission(conn, namespace.id, &system_namespace_permission())
            .await?;
        namespace_ids.insert(*path, namespace.id);
    }

    let mut tag_objects = HashMap::new();
    for (path, _) in SYSTEM_TAGS {
        let parent = parent_path(path).ok_or_else(|| {
            TagstoreError::UnknownPath(vec![path.to_string()])
        })?;
        let tag = tags::create_tag(
            conn,
            admin.id,
            namespace_ids[parent],
            Uuid::new_v4(),
            path,
        )
        .await?;
        permissions::create_tag_permission(conn, tag.id, &system_tag_permission()).await?;
        tag_objects.insert(*path, tag.object_id);
    }

    // With the tags in place the system values can go in through the
    // regular write path, about rows included.
    let mut system_values: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
    let loaded = namespaces::get_namespaces(conn, None, None).await?;
    let descriptions: HashMap<&str, &str> = SYSTEM_NAMESPACES.iter().copied().collect();
    for namespace in &loaded {
        let about = namespace_about(&namespace.path);
        values::create_about_tag_value(conn, namespace.object_id, &about, &fold_about(&about))
            .await?;
        system_values.insert(
            namespace.object_id,
            HashMap::from([
                (ABOUT_TAG.to_string(), TagValue::Text(about)),
                (
                    NAMESPACE_PATH_TAG.to_string(),
                    TagValue::Text(namespace.path.clone()),
                ),
                (
                    NAMESPACE_DESCRIPTION_TAG.to_string(),
                    TagValue::Text(descriptions[namespace.path.as_str()].to_string()),
                ),
            ]),
        );
    }
    for (path, description) in SYSTEM_TAGS {
        let object_id = tag_objects[path];
        let about = tag_about(path);
        values::create_about_tag_value(conn, object_id, &about, &fold_about(&about)).await?;
        system_values.insert(
            object_id,
            HashMap::from([
                (ABOUT_TAG.to_string(), TagValue::Text(about)),
                (TAG_PATH_TAG.to_string(), TagValue::Text(path.to_string())),
                (
                    TAG_DESCRIPTION_TAG.to_string(),
                    TagValue::Text(description.to_string()),
                ),
            ]),
        );
    }
    for user in [&admin, &anon] {
        let about = user_about(&user.username);
        values::create_about_tag_value(conn, user.object_id, &about, &fold_about(&about)).await?;
        system_values.insert(
            user.object_id,
            HashMap::from([
                (ABOUT_TAG.to_string(), TagValue::Text(about)),
                (
                    USER_USERNAME_TAG.to_string(),
                    TagValue::Text(user.username.clone()),
                ),
                (USER_NAME_TAG.to_string(), TagValue::Text(user.fullname.clone())),
                (USER_EMAIL_TAG.to_string(), TagValue::Text(user.email.clone())),
            ]),
        );
    }
    TagValueApi::new(&admin)
        .set_known(conn, &system_values)
        .await?;

    Ok(SystemData { admin, anon })
}
