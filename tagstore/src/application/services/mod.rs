// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Model Services
//!
//! The business logic for each entity kind: batched create/get/set/delete,
//! implicit parent creation, system metadata upkeep.  Every public method
//! takes a `&mut SqliteConnection` so it joins whatever transaction the
//! caller opened, and none of them checks permissions: that is the
//! security layer's job.
//!
//! ## System metadata
//!
//! Creating a namespace, tag or user also creates its object (reusing an
//! existing one when the about value already exists) and writes the
//! `fluiddb/about`, `…/path` and `…/description` system tag values on the
//! admin user's behalf.

pub mod namespace;
pub mod object;
pub mod permission;
pub mod recent_activity;
pub mod system;
pub mod tag;
pub mod user;
pub mod value;

use sqlx::SqliteConnection;

use tagstore_domain::{TagstoreError, User};

use crate::infrastructure::repositories::users;

/// The distinguished about tag.
pub const ABOUT_TAG: &str = "fluiddb/about";
/// The virtual object-ID tag; never stored, always readable.
pub const ID_TAG: &str = "fluiddb/id";
/// System tag holding a namespace's path.
pub const NAMESPACE_PATH_TAG: &str = "fluiddb/namespaces/path";
/// System tag holding a namespace's description.
pub const NAMESPACE_DESCRIPTION_TAG: &str = "fluiddb/namespaces/description";
/// System tag holding a tag's path.
pub const TAG_PATH_TAG: &str = "fluiddb/tags/path";
/// System tag holding a tag's description.
pub const TAG_DESCRIPTION_TAG: &str = "fluiddb/tags/description";
/// System tag holding a user's username.
pub const USER_USERNAME_TAG: &str = "fluiddb/users/username";
/// System tag holding a user's full name.
pub const USER_NAME_TAG: &str = "fluiddb/users/name";
/// System tag holding a user's email address.
pub const USER_EMAIL_TAG: &str = "fluiddb/users/email";

/// The superuser owning system data.
pub const ADMIN_USERNAME: &str = "fluiddb";
/// The anonymous user.
pub const ANON_USERNAME: &str = "anon";

/// Cap on the number of objects a `has <path>` query returns.
pub const HAS_QUERY_LIMIT: i64 = 10_000;

/// Loads the admin user, who owns all system tag values.
pub(crate) async fn admin_user(conn: &mut SqliteConnection) -> Result<User, TagstoreError> {
    users::get_user(conn, ADMIN_USERNAME)
        .await?
        .ok_or_else(|| TagstoreError::UnknownUser(vec![ADMIN_USERNAME.to_string()]))
}
