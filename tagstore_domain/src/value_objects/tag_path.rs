// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Path Value Object
//!
//! Namespaces and tags live under hierarchical, slash-separated paths whose
//! first segment is the owning username.  This module provides the validated
//! `TagPath` value object plus the free helper functions the model layer
//! uses to walk path hierarchies in bulk.
//!
//! ## Validation Rules
//!
//! - **Length**: 1 to 233 characters for the whole path
//! - **Segments**: each slash-separated segment matches `[A-Za-z0-9_.:\-]+`
//! - **Ownership**: the first segment is lowercase; it names the owning user
//!
//! The 233-character limit is part of the documented public API and is kept
//! for compatibility even though nothing in the storage layer requires it.

use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::TagstoreError;

/// Maximum length, in characters, of a fully-qualified path.
pub const MAX_PATH_LENGTH: usize = 233;

/// A validated, fully-qualified namespace or tag path.
///
/// Immutable once constructed; equality and hashing follow the underlying
/// string, so paths can key maps and sets directly.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagPath(String);

impl TagPath {
    /// Parses and validates a path.
    ///
    /// # Errors
    /// Returns `TagstoreError::MalformedPath` if the path is empty, too
    /// long, contains an invalid segment, or its first segment is not
    /// lowercase.
    pub fn parse(path: &str) -> Result<Self, TagstoreError> {
        if is_valid_path(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(TagstoreError::MalformedPath(format!(
                "'{}' is not a valid path",
                path
            )))
        }
    }

    /// Gets the underlying path string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the path, returning the underlying string
    pub fn into_string(self) -> String {
        self.0
    }

    /// The name of the final entity in the path.
    pub fn name(&self) -> &str {
        path_name(&self.0)
    }

    /// The parent path, or `None` for a root-level entity.
    pub fn parent(&self) -> Option<TagPath> {
        parent_path(&self.0).map(|parent| Self(parent.to_string()))
    }

    /// Checks whether this is a root-level path (a bare username).
    pub fn is_root(&self) -> bool {
        !self.0.contains('/')
    }

    /// The username owning this path (the first segment).
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TagPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

/// Determines whether `path` satisfies the path grammar.
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || path.chars().count() > MAX_PATH_LENGTH {
        return false;
    }
    let mut segments = path.split('/');
    match segments.next() {
        Some(first) if is_valid_segment(first) => {
            if first.chars().any(|c| c.is_ascii_uppercase()) {
                return false;
            }
        }
        _ => return false,
    }
    segments.all(is_valid_segment)
}

/// Determines whether `username` is valid: a single lowercase path segment.
pub fn is_valid_username(username: &str) -> bool {
    is_valid_path(username) && !username.contains('/')
}

/// Gets the name of the final entity in `path`.
pub fn path_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Gets the parent path of `path`, or `None` for a root-level entity.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Gets the set of parent paths for the specified paths.
pub fn parent_paths<'a, I>(paths: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    paths
        .into_iter()
        .filter_map(|path| parent_path(path))
        .map(str::to_string)
        .collect()
}

/// Gets the given paths plus all their parents up to the root namespace.
pub fn path_hierarchy<'a, I>(paths: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hierarchy = HashSet::new();
    for path in paths {
        hierarchy.insert(path.to_string());
        let mut parent = parent_path(path);
        while let Some(current) = parent {
            hierarchy.insert(current.to_string());
            parent = parent_path(current);
        }
    }
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_accepts_well_formed_paths() {
        for path in ["alice", "alice/books", "alice/books/rating", "fluiddb/about", "a.b:c-d_e/f"] {
            assert!(TagPath::parse(path).is_ok(), "{} should parse", path);
        }
    }

    #[test]
    fn parse_rejects_bad_paths() {
        for path in ["", "/", "alice//books", "alice/", "/alice", "Alice/books", "alice/bo oks", "alice/b!"] {
            assert!(TagPath::parse(path).is_err(), "{} should not parse", path);
        }
    }

    #[test]
    fn parse_rejects_overlong_paths() {
        let long = format!("alice/{}", "x".repeat(MAX_PATH_LENGTH));
        assert!(TagPath::parse(&long).is_err());
    }

    #[test]
    fn uppercase_is_allowed_after_the_first_segment() {
        assert!(TagPath::parse("alice/Books").is_ok());
        assert!(TagPath::parse("Alice/books").is_err());
    }

    #[test]
    fn name_and_parent() {
        let path = TagPath::parse("alice/books/rating").unwrap();
        assert_eq!(path.name(), "rating");
        assert_eq!(path.parent().unwrap().as_str(), "alice/books");
        assert_eq!(path.owner(), "alice");
        assert!(!path.is_root());

        let root = TagPath::parse("alice").unwrap();
        assert_eq!(root.name(), "alice");
        assert!(root.parent().is_none());
        assert!(root.is_root());
    }

    #[test]
    fn hierarchy_includes_all_ancestors() {
        let hierarchy = path_hierarchy(["alice/books/rating", "bob/films"]);
        let expected: HashSet<String> = [
            "alice/books/rating",
            "alice/books",
            "alice",
            "bob/films",
            "bob",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(hierarchy, expected);
    }

    #[test]
    fn parent_paths_skips_roots() {
        let parents = parent_paths(["alice/books", "bob"]);
        assert_eq!(parents, HashSet::from(["alice".to_string()]));
    }

    #[test]
    fn usernames_are_single_segments() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("a.b-c_d"));
        assert!(!is_valid_username("alice/books"));
        assert!(!is_valid_username("Alice"));
        assert!(!is_valid_username(""));
    }

    proptest! {
        #[test]
        fn valid_paths_round_trip(segments in prop::collection::vec("[a-z0-9_.:\\-]{1,8}", 1..5)) {
            let path = segments.join("/");
            prop_assume!(path.len() <= MAX_PATH_LENGTH);
            let parsed = TagPath::parse(&path).unwrap();
            prop_assert_eq!(parsed.as_str(), path.as_str());
        }
    }
}
