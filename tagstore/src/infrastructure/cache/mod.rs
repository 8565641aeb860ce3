// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Caching Layer
//!
//! A write-through cache over the model layer for the three hot read
//! paths: permission objects, about → object-ID lookups, and single-key
//! recent-activity listings.  Reads fall through to the database on miss
//! and populate the cache on the way out; mutations invalidate the
//! affected keys; cache transport failures are logged and degrade to the
//! database path.

pub mod client;
pub mod object_cache;
pub mod permission_cache;
pub mod recent_activity_cache;

pub use client::{
    BrokenCacheClient, Cache, CacheClient, CacheError, CacheResult, InMemoryCacheClient,
    RedisCacheClient,
};
pub use object_cache::ObjectCache;
pub use permission_cache::{PermissionCache, PermissionKind};
pub use recent_activity_cache::RecentActivityCache;
