// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! All failures in the system surface as one of a closed taxonomy.  Each
//! variant has a stable wire name, used unchanged by the HTTP frontend, so
//! adding or renaming variants is a compatibility-affecting change.
//!
//! ## Propagation
//!
//! The model layer raises typed errors; the caching layer passes them
//! through (cache transport failures are logged, never raised); the security
//! layer adds `PermissionDenied`; the facade hands the taxonomy to the
//! frontend as-is.  Transactions roll back on any raised error.
//!
//! ## Internal variants
//!
//! `DatabaseError`, `SerializationError` and `IoError` wrap infrastructure
//! failures that have no meaningful client-side handling.  They exist so
//! `?` works across the storage boundary without collapsing everything into
//! a stringly-typed error.

use thiserror::Error;
use uuid::Uuid;

use crate::permission::Operation;

/// Domain-specific errors for the tag store.
///
/// Each variant carries enough context to produce an actionable message and
/// maps one-to-one onto the wire-level error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TagstoreError {
    /// A referenced path does not exist and no implicit-creation rule
    /// applies.
    #[error("Unknown paths: {}", .0.join(", "))]
    UnknownPath(Vec<String>),

    #[error("Paths already exist: {0}")]
    DuplicatePath(String),

    #[error("Malformed path: {0}")]
    MalformedPath(String),

    #[error("Can't delete non-empty namespace: {0}")]
    NamespaceNotEmpty(String),

    #[error("Unknown users: {}", .0.join(", "))]
    UnknownUser(Vec<String>),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("User not allowed in exception list: {0}")]
    UserNotAllowedInException(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Carries the acting username and the `(path, operation)` pairs that
    /// were denied.
    #[error("Permission denied for user '{username}'")]
    PermissionDenied {
        username: String,
        denials: Vec<(String, Operation)>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Well-formed but unexecutable query, such as `has fluiddb/about`.
    #[error("Illegal query: {0}")]
    IllegalQuery(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("No value for tag '{path}' on object {object_id}")]
    NoInstanceOnObject { object_id: Uuid, path: String },

    /// Invariant violation by the caller: empty batch, nil path, invalid
    /// operation for the entity kind.
    #[error("Feature error: {0}")]
    FeatureError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl TagstoreError {
    /// Creates a new feature error
    pub fn feature(msg: impl Into<String>) -> Self {
        Self::FeatureError(msg.into())
    }

    /// Creates a new bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a new search error
    pub fn search(msg: impl Into<String>) -> Self {
        Self::SearchError(msg.into())
    }

    /// Creates a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Creates a new database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// The stable name used for this error over the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TagstoreError::UnknownPath(_) => "UnknownPath",
            TagstoreError::DuplicatePath(_) => "DuplicatePath",
            TagstoreError::MalformedPath(_) => "MalformedPath",
            TagstoreError::NamespaceNotEmpty(_) => "NamespaceNotEmpty",
            TagstoreError::UnknownUser(_) => "UnknownUser",
            TagstoreError::InvalidUsername(_) => "InvalidUsername",
            TagstoreError::UserNotAllowedInException(_) => "UserNotAllowedInException",
            TagstoreError::InvalidPolicy(_) => "InvalidPolicy",
            TagstoreError::PermissionDenied { .. } => "PermissionDenied",
            TagstoreError::Unauthorized(_) => "Unauthorized",
            TagstoreError::BadRequest(_) => "BadRequest",
            TagstoreError::ParseError(_) => "ParseError",
            TagstoreError::IllegalQuery(_) => "IllegalQuery",
            TagstoreError::SearchError(_) => "SearchError",
            TagstoreError::NoInstanceOnObject { .. } => "NoInstanceOnObject",
            TagstoreError::FeatureError(_) => "FeatureError",
            TagstoreError::DatabaseError(_) => "InternalError",
            TagstoreError::SerializationError(_) => "InternalError",
            TagstoreError::IoError(_) => "InternalError",
        }
    }

    /// Checks if the error is a client-side input error rather than a
    /// system failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            TagstoreError::DatabaseError(_)
                | TagstoreError::SerializationError(_)
                | TagstoreError::IoError(_)
                | TagstoreError::SearchError(_)
        )
    }
}

impl From<std::io::Error> for TagstoreError {
    fn from(err: std::io::Error) -> Self {
        TagstoreError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TagstoreError {
    fn from(err: serde_json::Error) -> Self {
        TagstoreError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_stable() {
        assert_eq!(
            TagstoreError::UnknownPath(vec!["a/b".into()]).wire_name(),
            "UnknownPath"
        );
        let denied = TagstoreError::PermissionDenied {
            username: "alice".into(),
            denials: vec![("alice/books".into(), Operation::ReadTagValue)],
        };
        assert_eq!(denied.wire_name(), "PermissionDenied");
        assert_eq!(
            TagstoreError::DatabaseError("down".into()).wire_name(),
            "InternalError"
        );
    }

    #[test]
    fn internal_errors_are_not_client_errors() {
        assert!(TagstoreError::MalformedPath("x".into()).is_client_error());
        assert!(!TagstoreError::DatabaseError("x".into()).is_client_error());
    }
}
