// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Main Store Data Access
//!
//! Collection-style data access over the SQLite main store.  Every function
//! takes a `&mut SqliteConnection` so a request's statements all run inside
//! the transaction the facade opened, and every function accepts sets or
//! slices so the layers above never issue per-row round trips.
//!
//! Schema-level invariants (unique paths, usernames and about values,
//! unique `(object, tag)` pairs, cascades from tags to values to opaque
//! links) are enforced by the migrations in `migrations/`; this module
//! translates constraint violations into the domain error taxonomy at the
//! few places they are part of the contract.

pub mod namespaces;
pub mod objects;
pub mod permissions;
pub mod recent_activity;
pub mod schema;
pub mod tags;
pub mod users;
pub mod values;

use tagstore_domain::TagstoreError;

/// Maps an sqlx failure into the domain error taxonomy.
pub(crate) fn db_err(error: sqlx::Error) -> TagstoreError {
    TagstoreError::DatabaseError(error.to_string())
}

/// Builds a `?, ?, …` placeholder list for an `IN` clause.
pub(crate) fn placeholders(count: usize) -> String {
    let mut text = String::with_capacity(count.saturating_mul(3));
    for index in 0..count {
        if index > 0 {
            text.push_str(", ");
        }
        text.push('?');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
