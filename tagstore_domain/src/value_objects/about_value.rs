// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # About Values
//!
//! An about value is the globally-unique human-readable identifier an object
//! can carry via the `fluiddb/about` tag.  Namespaces, tags and users get
//! canonical about values so their objects can be found by name, and so a
//! deleted path recreated later resolves to the same object ID.
//!
//! About values are compared case-folded, except URLs which are kept as-is;
//! the stored value preserves the case supplied on first create.

/// Folds an about value to the form used for uniqueness comparisons.
///
/// URLs (`http://` / `https://`) are compared exactly; everything else is
/// compared case-folded.
pub fn fold_about(value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

/// The canonical about value for a namespace's object.
pub fn namespace_about(path: &str) -> String {
    format!("Object for the namespace {}", path)
}

/// The canonical about value for a tag's object.
pub fn tag_about(path: &str) -> String {
    format!("Object for the attribute {}", path)
}

/// The canonical about value for a user's object.
pub fn user_about(username: &str) -> String {
    format!("@{}", username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_is_case_insensitive_for_plain_text() {
        assert_eq!(fold_about("Éric Serra"), fold_about("éric serra"));
        assert_eq!(fold_about("Hello"), "hello");
    }

    #[test]
    fn urls_are_kept_as_is() {
        assert_eq!(
            fold_about("http://example.com/Path"),
            "http://example.com/Path"
        );
        assert_ne!(
            fold_about("https://example.com/A"),
            fold_about("https://example.com/a")
        );
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(
            namespace_about("alice/books"),
            "Object for the namespace alice/books"
        );
        assert_eq!(
            tag_about("alice/books/rating"),
            "Object for the attribute alice/books/rating"
        );
        assert_eq!(user_about("alice"), "@alice");
    }
}
