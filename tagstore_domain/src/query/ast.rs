// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Query AST
//!
//! A query is a boolean expression over tag predicates: `has <path>`,
//! `<path> <op> <literal>`, combined with `and`, `or` and `except`
//! (set difference).  The tree is produced by the parser and consumed by
//! the object-search layer, which resolves special paths directly and
//! translates everything else into index queries.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TagstoreError;
use crate::query::parser::Parser;

/// A comparison operator in a tag predicate.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    /// Full-text containment, with wildcarding for single terms.
    Matches,
    /// Set membership on a set-of-strings value.
    Contains,
}

/// A literal value on the right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A node in the query expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Matches objects carrying any value for the path.
    Has { path: String },
    /// Matches objects whose value for the path satisfies the comparison.
    Compare {
        path: String,
        operator: Comparison,
        value: Literal,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Except(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Collects every path mentioned anywhere in the expression.
    pub fn paths(&self) -> HashSet<&str> {
        let mut paths = HashSet::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut HashSet<&'a str>) {
        match self {
            Expression::Has { path } => {
                paths.insert(path.as_str());
            }
            Expression::Compare { path, .. } => {
                paths.insert(path.as_str());
            }
            Expression::And(left, right)
            | Expression::Or(left, right)
            | Expression::Except(left, right) => {
                left.collect_paths(paths);
                right.collect_paths(paths);
            }
        }
    }
}

/// A parsed query: the original text plus its expression tree.
///
/// Equality and hashing follow the query text, so queries can key the
/// result maps handed back by the search layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    text: String,
    root: Expression,
}

impl Query {
    /// Parses query text into a `Query`.
    ///
    /// # Errors
    /// Returns `TagstoreError::ParseError` if the text is not a well-formed
    /// query.
    pub fn parse(text: &str) -> Result<Self, TagstoreError> {
        let root = Parser::new(text)?.parse()?;
        Ok(Self {
            text: text.to_string(),
            root,
        })
    }

    /// The original query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The root of the expression tree
    pub fn root(&self) -> &Expression {
        &self.root
    }

    /// If the query is a single `<path> = <literal>` predicate on the given
    /// path, returns the literal.
    pub fn equality_on(&self, path: &str) -> Option<&Literal> {
        match &self.root {
            Expression::Compare {
                path: query_path,
                operator: Comparison::Equal,
                value,
            } if query_path == path => Some(value),
            _ => None,
        }
    }

    /// If the query is a single `has <path>` predicate, returns the path.
    pub fn has_path(&self) -> Option<&str> {
        match &self.root {
            Expression::Has { path } => Some(path.as_str()),
            _ => None,
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}
