// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Index Field Mapping
//!
//! Each `(path, value)` pair becomes a dynamic field on the object's index
//! document, named by the path plus a type suffix:
//!
//! | value        | suffix          |
//! |--------------|-----------------|
//! | null         | `_tag_null` (stores `false`) |
//! | boolean      | `_tag_bool`     |
//! | int / float  | `_tag_number`   |
//! | string       | `_tag_raw_str` (exact) / `_tag_fts` (full text) |
//! | set          | `_tag_set_str` / `_tag_fts` |
//! | opaque       | `_tag_binary` (stores the SHA-256 file ID) |
//!
//! A `paths` field lists every path present on the object, backing
//! `has <path>` queries.  Documents only write the raw fields; the index
//! schema copies raw string fields into the fts fields.
//!
//! This suffix scheme is part of the compatibility surface with the
//! external index; changing it requires a clean rebuild.

use tagstore_domain::query::{Comparison, Expression, Literal};
use tagstore_domain::value_objects::is_valid_path;
use tagstore_domain::TagstoreError;

/// Lucene special characters that need escaping in exact terms.
const SPECIAL_CHARACTERS: &[char] = &[
    '\\', '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', ':', '~', '*', '?',
];

/// Characters kept live by `escape_with_wildcards`.
const WILDCARD_CHARACTERS: &[char] = &['*', '?', '~'];

/// Escapes every Lucene special character in `term`.
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes Lucene special characters except wildcards, so `*`, `?` and
/// `~` in the user's term keep their meaning.
pub fn escape_with_wildcards(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARACTERS.contains(&c) && !WILDCARD_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Gets the dynamic field name and document value for a stored JSON tag
/// value, used when building index documents.
pub fn field_for_json(
    path: &str,
    value: &serde_json::Value,
    raw: bool,
) -> Result<(String, serde_json::Value), TagstoreError> {
    if !is_valid_path(path) {
        return Err(TagstoreError::search(format!("invalid path: {}", path)));
    }
    let (suffix, value) = match value {
        serde_json::Value::Null => ("_tag_null", serde_json::Value::Bool(false)),
        serde_json::Value::Bool(_) => ("_tag_bool", value.clone()),
        serde_json::Value::Number(_) => ("_tag_number", value.clone()),
        serde_json::Value::String(_) => {
            (if raw { "_tag_raw_str" } else { "_tag_fts" }, value.clone())
        }
        serde_json::Value::Array(_) => {
            (if raw { "_tag_set_str" } else { "_tag_fts" }, value.clone())
        }
        serde_json::Value::Object(fields) => {
            let file_id = fields.get("file-id").cloned().ok_or_else(|| {
                TagstoreError::search(format!("opaque value for {} has no file id", path))
            })?;
            ("_tag_binary", file_id)
        }
    };
    Ok((format!("{}{}", path, suffix), value))
}

fn field_for_literal(path: &str, value: &Literal, raw: bool) -> (String, String) {
    let (suffix, value) = match value {
        Literal::Null => ("_tag_null", "false".to_string()),
        Literal::Boolean(b) => ("_tag_bool", b.to_string()),
        Literal::Integer(i) => ("_tag_number", i.to_string()),
        Literal::Float(f) => ("_tag_number", f.to_string()),
        Literal::Text(s) => (
            if raw { "_tag_raw_str" } else { "_tag_fts" },
            s.clone(),
        ),
    };
    (format!("{}{}", path, suffix), value)
}

fn number_bound(path: &str, value: &Literal) -> Result<String, TagstoreError> {
    match value {
        Literal::Integer(i) => Ok(i.to_string()),
        Literal::Float(f) => Ok(f.to_string()),
        other => Err(TagstoreError::search(format!(
            "comparison on {} requires a numeric value, got {:?}",
            path, other
        ))),
    }
}

/// Builds the index query string for an expression tree.
///
/// # Errors
/// Returns `SearchError` for queries the index cannot answer: anything
/// touching `fluiddb/id`, or range comparisons on non-numeric literals.
pub fn build_index_query(expression: &Expression) -> Result<String, TagstoreError> {
    match expression {
        Expression::Or(left, right) => Ok(format!(
            "({}) OR ({})",
            build_index_query(left)?,
            build_index_query(right)?
        )),
        Expression::And(left, right) => Ok(format!(
            "({}) AND ({})",
            build_index_query(left)?,
            build_index_query(right)?
        )),
        Expression::Except(left, right) => Ok(format!(
            "({}) NOT ({})",
            build_index_query(left)?,
            build_index_query(right)?
        )),
        Expression::Has { path } => {
            check_queryable(path)?;
            Ok(format!("paths:\"{}\"", path))
        }
        Expression::Compare {
            path,
            operator,
            value,
        } => {
            check_queryable(path)?;
            match operator {
                Comparison::Equal => {
                    let (field, term) = field_for_literal(path, value, true);
                    Ok(format!("{}:\"{}\"", field, escape_term(&term)))
                }
                Comparison::NotEqual => {
                    let (field, term) = field_for_literal(path, value, true);
                    Ok(format!("NOT {}:\"{}\"", field, escape_term(&term)))
                }
                Comparison::Matches => {
                    let (field, term) = field_for_literal(path, value, false);
                    if term.is_empty() {
                        // An empty fts field is absent from the document, so
                        // match on field absence.
                        Ok(format!("-{}:[* TO *]", field))
                    } else if term.chars().any(char::is_whitespace) {
                        Ok(format!("{}:\"{}\"", field, escape_term(&term)))
                    } else {
                        Ok(format!("{}:{}", field, escape_with_wildcards(&term)))
                    }
                }
                Comparison::Contains => {
                    let term = match value {
                        Literal::Text(s) => s.clone(),
                        Literal::Integer(i) => i.to_string(),
                        Literal::Float(f) => f.to_string(),
                        Literal::Boolean(b) => b.to_string(),
                        Literal::Null => "null".to_string(),
                    };
                    Ok(format!(
                        "{}_tag_set_str:\"{}\"",
                        path,
                        escape_term(&term)
                    ))
                }
                Comparison::LessThan => Ok(format!(
                    "{}_tag_number:{{* TO {}}}",
                    path,
                    number_bound(path, value)?
                )),
                Comparison::LessOrEqual => Ok(format!(
                    "{}_tag_number:[* TO {}]",
                    path,
                    number_bound(path, value)?
                )),
                Comparison::GreaterThan => Ok(format!(
                    "{}_tag_number:{{{} TO *}}",
                    path,
                    number_bound(path, value)?
                )),
                Comparison::GreaterOrEqual => Ok(format!(
                    "{}_tag_number:[{} TO *]",
                    path,
                    number_bound(path, value)?
                )),
            }
        }
    }
}

fn check_queryable(path: &str) -> Result<(), TagstoreError> {
    if path == "fluiddb/id" {
        Err(TagstoreError::search(
            "fluiddb/id is not supported in queries",
        ))
    } else {
        Ok(())
    }
}
