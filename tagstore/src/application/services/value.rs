// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tag Value Service
//!
//! Reading and writing typed values on objects.  Writes replace any
//! existing `(object, tag)` row, split opaque payloads into
//! content-addressed storage, create missing tags implicitly, and append
//! the affected objects to the dirty log so the index catches up.
//!
//! Reading `fluiddb/id` never touches storage: the value *is* the object
//! ID.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::{TagValue, TagValueEntry, TagstoreError, User};

use crate::application::services::tag::TagApi;
use crate::application::services::{object::ObjectApi, ID_TAG};
use crate::infrastructure::repositories::{objects, tags, values};

use tagstore_domain::value_objects::tag_about;

/// The public API for tag values in the model layer.
pub struct TagValueApi {
    user: User,
}

impl TagValueApi {
    /// Creates a value service acting on behalf of `user`
    pub fn new(user: &User) -> Self {
        Self { user: user.clone() }
    }

    /// Gets values for objects, keyed by object then path.
    ///
    /// When `paths` is `None` every path present on the objects is
    /// returned.  Opaque values come back with their payloads attached.
    ///
    /// # Errors
    /// `FeatureError` for an empty object list.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        object_ids: &[Uuid],
        paths: Option<&[String]>,
    ) -> Result<HashMap<Uuid, HashMap<String, TagValueEntry>>, TagstoreError> {
        if object_ids.is_empty() {
            return Err(TagstoreError::feature(
                "can't get tag values for an empty list of object ids",
            ));
        }
        let paths: Vec<String> = match paths {
            Some(paths) => paths.to_vec(),
            None => {
                ObjectApi::new(&self.user)
                    .get_tags_for_objects(conn, object_ids)
                    .await?
            }
        };

        let mut result: HashMap<Uuid, HashMap<String, TagValueEntry>> = HashMap::new();

        if paths.iter().any(|path| path == ID_TAG) {
            for &object_id in object_ids {
                result
                    .entry(object_id)
                    .or_default()
                    .insert(ID_TAG.to_string(), TagValueEntry::object_id(object_id));
            }
            // Nothing else requested, so skip the database entirely.
            if paths.len() == 1 {
                return Ok(result);
            }
        }

        let stored_paths: Vec<String> =
            paths.iter().filter(|p| *p != ID_TAG).cloned().collect();
        let rows =
            values::get_values_with_paths(conn, Some(object_ids), Some(&stored_paths), None)
                .await?;
        for (path, row, username) in rows {
            let contents = if row.value.is_object() {
                values::get_opaque_content(conn, row.id).await?
            } else {
                None
            };
            let value = TagValue::from_stored_json(&row.value, contents)?;
            result.entry(row.object_id).or_default().insert(
                path,
                TagValueEntry {
                    value,
                    username,
                    creation_time: row.creation_time,
                },
            );
        }
        Ok(result)
    }

    /// Sets or updates values, creating missing tags implicitly.
    ///
    /// # Errors
    /// `FeatureError` for an empty update; `MalformedPath` if an implicit
    /// tag path is invalid.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        updates: &HashMap<Uuid, HashMap<String, TagValue>>,
    ) -> Result<(), TagstoreError> {
        if updates.is_empty() {
            return Err(TagstoreError::feature(
                "can't set an empty list of tag values",
            ));
        }

        let mut paths: HashSet<String> = HashSet::new();
        for tag_values in updates.values() {
            paths.extend(tag_values.keys().cloned());
        }
        let path_list: Vec<String> = paths.iter().cloned().collect();
        let known = tags::get_tag_ids(conn, &path_list).await?;
        let missing: Vec<(String, String)> = paths
            .iter()
            .filter(|path| !known.contains_key(*path))
            .map(|path| (path.clone(), tag_about(path)))
            .collect();
        if !missing.is_empty() {
            TagApi::new(&self.user).create(conn, &missing).await?;
        }

        self.set_known(conn, updates).await
    }

    /// Sets values for tags that are known to exist.  Shared by `set` and
    /// the services writing system tag values.
    pub(crate) async fn set_known(
        &self,
        conn: &mut SqliteConnection,
        updates: &HashMap<Uuid, HashMap<String, TagValue>>,
    ) -> Result<(), TagstoreError> {
        let mut paths: HashSet<String> = HashSet::new();
        for tag_values in updates.values() {
            paths.extend(tag_values.keys().cloned());
        }
        let path_list: Vec<String> = paths.into_iter().collect();
        let tag_ids = tags::get_tag_ids(conn, &path_list).await?;
        if let Some(missing) = path_list.iter().find(|path| !tag_ids.contains_key(*path)) {
            return Err(TagstoreError::UnknownPath(vec![missing.clone()]));
        }

        // Replace any existing rows for the updated pairs.
        let mut pairs = Vec::new();
        for (object_id, tag_values) in updates {
            for path in tag_values.keys() {
                pairs.push((*object_id, tag_ids[path]));
            }
        }
        values::delete_tag_values(conn, &pairs).await?;

        for (object_id, tag_values) in updates {
            for (path, value) in tag_values {
                let stored = value.to_stored_json();
                let value_id = values::create_tag_value(
                    conn,
                    self.user.id,
                    tag_ids[path],
                    *object_id,
                    &stored,
                )
                .await?;
                if let TagValue::Opaque(opaque) = value {
                    values::create_opaque_value(conn, value_id, &opaque.contents).await?;
                }
            }
        }

        let object_ids: Vec<Uuid> = updates.keys().copied().collect();
        objects::touch_objects(conn, &object_ids).await
    }

    /// Deletes values for `(object, path)` pairs.  Missing rows are
    /// skipped; missing tag paths are an error.
    ///
    /// # Errors
    /// `FeatureError` for an empty batch; `UnknownPath` if a path names no
    /// tag.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        pairs: &[(Uuid, String)],
    ) -> Result<u64, TagstoreError> {
        if pairs.is_empty() {
            return Err(TagstoreError::feature(
                "can't delete an empty list of tag values",
            ));
        }
        let paths: Vec<String> = pairs
            .iter()
            .map(|(_, path)| path.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let tag_ids = tags::get_tag_ids(conn, &paths).await?;
        if let Some(missing) = paths.iter().find(|path| !tag_ids.contains_key(*path)) {
            return Err(TagstoreError::UnknownPath(vec![missing.clone()]));
        }

        let value_pairs: Vec<(Uuid, i64)> = pairs
            .iter()
            .map(|(object_id, path)| (*object_id, tag_ids[path]))
            .collect();
        let deleted = values::delete_tag_values(conn, &value_pairs).await?;
        if deleted > 0 {
            let object_ids: Vec<Uuid> = pairs
                .iter()
                .map(|(object_id, _)| *object_id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            objects::touch_objects(conn, &object_ids).await?;
        }
        Ok(deleted)
    }
}
