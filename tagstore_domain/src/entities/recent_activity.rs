// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Recent-activity listings: the newest tag values touching an object or
//! written by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a recent-activity listing.
///
/// `value` is the stored JSON form; opaque values are reported as
/// `{"value-type": …, "size": …}` so listings never carry payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub tag_path: String,
    pub object_id: Uuid,
    pub about: Option<String>,
    pub value: serde_json::Value,
    pub username: String,
    pub creation_time: DateTime<Utc>,
}
