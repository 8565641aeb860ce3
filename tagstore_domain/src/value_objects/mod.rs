// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: validated paths and about values.

pub mod about_value;
pub mod tag_path;

pub use about_value::{fold_about, namespace_about, tag_about, user_about};
pub use tag_path::{
    is_valid_path, is_valid_username, parent_path, parent_paths, path_hierarchy, path_name,
    TagPath, MAX_PATH_LENGTH,
};
