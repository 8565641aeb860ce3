// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Service
//!
//! Objects are UUIDs; this service mints them, resolves them by about
//! value, enumerates the paths present on them, and resolves queries.
//!
//! ## Query classification
//!
//! Each query gets one of four treatments:
//!
//! 1. `fluiddb/about = "literal"` — answered from the about table, never
//!    the index; optionally creates the object when asked to.
//! 2. `fluiddb/id = "uuid"` — parsed locally; malformed input is a
//!    `SearchError`.
//! 3. `has <path>` — answered by a path → objects lookup on the main
//!    store, capped at 10,000 rows.  `has` on the about or id tags is an
//!    `IllegalQuery`.
//! 4. Anything else goes to the full-text index.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::query::Literal;
use tagstore_domain::value_objects::fold_about;
use tagstore_domain::{Query, TagValue, TagstoreError, User};

use crate::application::services::value::TagValueApi;
use crate::application::services::{admin_user, ABOUT_TAG, HAS_QUERY_LIMIT, ID_TAG};
use crate::infrastructure::index::ObjectIndex;
use crate::infrastructure::repositories::values;

/// The public API for object IDs in the model layer.
pub struct ObjectApi {
    user: User,
}

impl ObjectApi {
    /// Creates an object service acting on behalf of `user`
    pub fn new(user: &User) -> Self {
        Self { user: user.clone() }
    }

    /// Creates a new object, or returns the existing object for `about`.
    ///
    /// Without an about value this just mints a UUID and touches nothing.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        about: Option<&str>,
    ) -> Result<Uuid, TagstoreError> {
        let Some(about) = about else {
            return Ok(Uuid::new_v4());
        };

        let folded = fold_about(about);
        let existing = values::get_about_tag_values(conn, &[folded.clone()]).await?;
        if let Some((_, _, object_id)) = existing.into_iter().next() {
            return Ok(object_id);
        }

        let object_id = Uuid::new_v4();
        values::create_about_tag_value(conn, object_id, about, &folded).await?;
        let admin = admin_user(conn).await?;
        let mut updates = HashMap::new();
        updates.insert(
            object_id,
            HashMap::from([(ABOUT_TAG.to_string(), TagValue::Text(about.to_string()))]),
        );
        TagValueApi::new(&admin).set_known(conn, &updates).await?;
        Ok(object_id)
    }

    /// Gets object IDs matching about values, keyed by the requested
    /// values.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        about_values: &[String],
    ) -> Result<HashMap<String, Uuid>, TagstoreError> {
        let folded: Vec<String> = about_values.iter().map(|v| fold_about(v)).collect();
        let rows = values::get_about_tag_values(conn, &folded).await?;
        let by_folded: HashMap<String, Uuid> = rows
            .into_iter()
            .map(|(_, folded_value, object_id)| (folded_value, object_id))
            .collect();

        let mut result = HashMap::new();
        for (value, folded_value) in about_values.iter().zip(folded) {
            if let Some(object_id) = by_folded.get(&folded_value) {
                result.insert(value.clone(), *object_id);
            }
        }
        Ok(result)
    }

    /// Maps each object to the list of paths present on it.
    pub async fn get_tags_by_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, TagstoreError> {
        let pairs = values::get_tag_paths_and_object_ids(conn, object_ids).await?;
        let mut result: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (path, object_id) in pairs {
            result.entry(object_id).or_default().push(path);
        }
        Ok(result)
    }

    /// The distinct paths present on any of the objects.
    pub async fn get_tags_for_objects(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
    ) -> Result<Vec<String>, TagstoreError> {
        values::get_tag_paths_for_objects(conn, object_ids).await
    }

    /// Resolves queries to object-ID sets.
    ///
    /// # Errors
    /// `FeatureError` for an empty batch; `IllegalQuery` for `has` on the
    /// about or id tags; `SearchError` for malformed ids, non-string
    /// about literals, or index failures.
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        index: &ObjectIndex,
        queries: &[Query],
        implicit_create: bool,
    ) -> Result<HashMap<Query, HashSet<Uuid>>, TagstoreError> {
        if queries.is_empty() {
            return Err(TagstoreError::feature("queries must be provided"));
        }

        let mut results = HashMap::new();
        let mut index_queries = Vec::new();
        for query in queries {
            if let Some(literal) = query.equality_on(ABOUT_TAG) {
                let object_ids = self
                    .resolve_about_query(conn, literal, implicit_create)
                    .await?;
                results.insert(query.clone(), object_ids);
            } else if let Some(literal) = query.equality_on(ID_TAG) {
                results.insert(query.clone(), resolve_id_query(literal)?);
            } else if let Some(path) = query.has_path() {
                if path == ABOUT_TAG || path == ID_TAG {
                    return Err(TagstoreError::IllegalQuery(format!(
                        "has {} would match the whole universe",
                        path
                    )));
                }
                let object_ids = values::get_object_ids_for_paths(
                    conn,
                    &[path.to_string()],
                    Some(HAS_QUERY_LIMIT),
                )
                .await?;
                results.insert(query.clone(), object_ids.into_iter().collect());
            } else {
                index_queries.push(query.clone());
            }
        }

        // Index queries carry no transaction state, so they can fan out.
        let searches = index_queries.iter().map(|query| index.search(query));
        let resolved = futures::future::try_join_all(searches).await?;
        for (query, object_ids) in index_queries.into_iter().zip(resolved) {
            results.insert(query, object_ids);
        }
        Ok(results)
    }

    async fn resolve_about_query(
        &self,
        conn: &mut SqliteConnection,
        literal: &Literal,
        implicit_create: bool,
    ) -> Result<HashSet<Uuid>, TagstoreError> {
        let Literal::Text(about) = literal else {
            return Err(TagstoreError::search("invalid about value type"));
        };
        let existing = self.get(conn, std::slice::from_ref(about)).await?;
        if let Some(object_id) = existing.get(about) {
            return Ok(HashSet::from([*object_id]));
        }
        if implicit_create {
            let object_id = self.create(conn, Some(about.as_str())).await?;
            return Ok(HashSet::from([object_id]));
        }
        Ok(HashSet::new())
    }
}

fn resolve_id_query(literal: &Literal) -> Result<HashSet<Uuid>, TagstoreError> {
    let Literal::Text(id) = literal else {
        return Err(TagstoreError::search("invalid object id type"));
    };
    let object_id = Uuid::parse_str(id)
        .map_err(|_| TagstoreError::search(format!("invalid object id: {}", id)))?;
    Ok(HashSet::from([object_id]))
}
