// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recent Activity Service
//!
//! The newest tag values on a set of objects, or written by a set of
//! users, newest first and capped at twenty entries.

use std::collections::HashSet;

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::entities::ActivityEntry;
use tagstore_domain::TagstoreError;

use crate::infrastructure::repositories::recent_activity::{
    get_recent_activity, DEFAULT_ACTIVITY_LIMIT,
};
use crate::infrastructure::repositories::users;

/// The public API for recent-activity listings in the model layer.
#[derive(Default)]
pub struct RecentActivityApi;

impl RecentActivityApi {
    /// Creates a recent-activity service
    pub fn new() -> Self {
        Self
    }

    /// Gets recent tag values on the given objects.
    pub async fn get_for_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        if object_ids.is_empty() {
            return Ok(vec![]);
        }
        get_recent_activity(conn, Some(object_ids), None, DEFAULT_ACTIVITY_LIMIT).await
    }

    /// Gets recent tag values written by the given users.
    ///
    /// # Errors
    /// `UnknownUser` if any username does not exist.
    pub async fn get_for_users(
        &self,
        conn: &mut SqliteConnection,
        usernames: &[String],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        if usernames.is_empty() {
            return Ok(vec![]);
        }
        let known = users::get_users(conn, Some(usernames), None).await?;
        let existing: HashSet<&str> = known.iter().map(|u| u.username.as_str()).collect();
        let unknown: Vec<String> = usernames
            .iter()
            .filter(|name| !existing.contains(name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(TagstoreError::UnknownUser(unknown));
        }
        get_recent_activity(conn, None, Some(usernames), DEFAULT_ACTIVITY_LIMIT).await
    }
}
