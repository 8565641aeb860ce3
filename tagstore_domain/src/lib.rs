// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagstore Domain
//!
//! The domain layer of the tag store: entities, value objects, the
//! permission model, the query language and the error taxonomy.  This crate
//! performs no I/O; persistence, caching and indexing live in the main
//! `tagstore` crate.
//!
//! ## Model
//!
//! Objects are UUID-identified and schemaless.  Tags give objects typed
//! values; tags live under hierarchical namespaces whose first path segment
//! is the owning username; every namespace and tag carries an independently
//! editable permission object.  A query language selects objects by
//! predicates over tag values.
//!
//! ## Layering
//!
//! - `entities` — users, namespaces, tags, tag values
//! - `value_objects` — validated paths, about values
//! - `permission` — operations, policies, permission objects, inheritance
//! - `query` — AST and parser
//! - `error` — the closed error taxonomy shared by every layer

pub mod entities;
pub mod error;
pub mod permission;
pub mod query;
pub mod value_objects;

pub use entities::{Namespace, NamespaceId, OpaqueValue, Role, Tag, TagId, TagValue, TagValueEntry, User, UserId};
pub use error::TagstoreError;
pub use permission::{Operation, Permission, Policy};
pub use query::Query;
pub use value_objects::TagPath;
