// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Full-Text Index
//!
//! Client, field mapping, the object index, and the out-of-band
//! synchronisation job that folds the dirty-object log into the external
//! inverted index.

pub mod client;
pub mod mapping;
pub mod object_index;
pub mod sync;

pub use client::{
    FailingIndexClient, IndexClient, RecordingIndexClient, SolrIndexClient, DEFAULT_ROW_LIMIT,
};
pub use object_index::ObjectIndex;
