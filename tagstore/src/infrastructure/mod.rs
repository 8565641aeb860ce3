// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: configuration, the SQLite main store, the cache
//! client and the full-text index client.

pub mod cache;
pub mod config;
pub mod index;
pub mod repositories;
