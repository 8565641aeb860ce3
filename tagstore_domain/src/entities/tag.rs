// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tags
//!
//! A tag is the *schema* for values: a path under a namespace that typed
//! values can be attached to, one per object.  The values themselves are
//! separate rows keyed by `(object, tag)`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::namespace::NamespaceId;
use crate::entities::user::UserId;

/// Internal identifier for a tag row.
pub type TagId = i64;

/// A tag under a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: TagId,
    pub object_id: Uuid,
    pub namespace_id: NamespaceId,
    pub creator_id: UserId,
    pub path: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}
