// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagstore
//!
//! An online store for openly-writable, typed, tag-based metadata about
//! arbitrary objects.  Objects are UUIDs; tags live under hierarchical
//! paths owned by users; every read and write of every tag on every object
//! is independently permissioned; a query language selects objects by
//! predicates over tag values.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Presentation: facade + CLI             │
//! └─────────────────┬───────────────────────┘
//! ┌─────────────────▼───────────────────────┐
//! │  Application: security → caching →      │
//! │  model services                         │
//! └─────────────────┬───────────────────────┘
//! ┌─────────────────▼───────────────────────┐
//! │  Infrastructure: SQLite store, cache    │
//! │  client, full-text index client + sync  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A write flows facade → security → caching → model → repositories, all
//! inside one transaction per request; the model appends affected object
//! IDs to the dirty-object log, and an out-of-band job (`tagstore index`)
//! folds dirty objects into the external full-text index.

pub mod application;
pub mod infrastructure;
pub mod presentation;
