// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Users
//!
//! Every operation is performed on behalf of a user, and every user is
//! also an object: they carry an object ID and a `@username` about value.
//! A user's root namespace has the same path as their username.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal identifier for a user row.
pub type UserId = i64;

/// The role a user acts under.
///
/// Roles are evaluated before any stored permission is consulted: a
/// superuser is granted everything, an anonymous user almost nothing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Role {
    Anonymous,
    User,
    UserManager,
    Superuser,
}

impl Role {
    /// The stable integer this role is stored as.
    pub fn id(self) -> i64 {
        match self {
            Role::Anonymous => 0,
            Role::User => 1,
            Role::UserManager => 2,
            Role::Superuser => 3,
        }
    }

    /// Looks a role up by its stored integer.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Role::Anonymous),
            1 => Some(Role::User),
            2 => Some(Role::UserManager),
            3 => Some(Role::Superuser),
            _ => None,
        }
    }
}

/// A user of the system.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub object_id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub fullname: String,
    pub email: String,
    pub role: Role,
    pub creation_time: DateTime<Utc>,
}

impl User {
    /// Checks if this user holds the superuser role
    pub fn is_superuser(&self) -> bool {
        self.role == Role::Superuser
    }

    /// Checks if this user is the anonymous user
    pub fn is_anonymous(&self) -> bool {
        self.role == Role::Anonymous
    }

    /// Checks if this user may manage other users
    pub fn is_user_manager(&self) -> bool {
        matches!(self.role, Role::UserManager | Role::Superuser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Anonymous, Role::User, Role::UserManager, Role::Superuser] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(99), None);
    }
}
