// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security wrapper for recent-activity listings.  Listings are public;
//! the wrapper exists so the facade talks to one layer everywhere.

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::entities::ActivityEntry;
use tagstore_domain::{TagstoreError, User};

use crate::application::caching::{CacheRegistry, CachingRecentActivityApi, InvalidationLog};

/// The public API to secure recent-activity functionality.
pub struct SecureRecentActivityApi {
    #[allow(dead_code)]
    user: User,
    api: CachingRecentActivityApi,
}

impl SecureRecentActivityApi {
    /// Creates a secure recent-activity service acting on behalf of `user`
    pub fn new(user: &User, cache: &CacheRegistry, _log: &InvalidationLog) -> Self {
        Self {
            user: user.clone(),
            api: CachingRecentActivityApi::new(cache),
        }
    }

    /// See [`crate::application::services::recent_activity::RecentActivityApi::get_for_objects`].
    pub async fn get_for_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        self.api.get_for_objects(conn, object_ids).await
    }

    /// See [`crate::application::services::recent_activity::RecentActivityApi::get_for_users`].
    pub async fn get_for_users(
        &self,
        conn: &mut SqliteConnection,
        usernames: &[String],
    ) -> Result<Vec<ActivityEntry>, TagstoreError> {
        self.api.get_for_users(conn, usernames).await
    }
}
