// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Namespaces
//!
//! A namespace is a container for tags and other namespaces.  Namespaces
//! form a tree: every namespace except a user's root namespace has a
//! parent, and a namespace cannot be deleted while it has children.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::user::UserId;

/// Internal identifier for a namespace row.
pub type NamespaceId = i64;

/// A namespace in the path hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub id: NamespaceId,
    pub object_id: Uuid,
    pub parent_id: Option<NamespaceId>,
    pub creator_id: UserId,
    pub path: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}

impl Namespace {
    /// Checks if this is a user's root namespace
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
