// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tag Service
//!
//! Creating a tag creates missing parent namespaces, the inherited
//! permission row, the tag's object and its system tag values.  Deleting
//! a tag dirties every object that carried a value for it, since those
//! documents must lose the field in the index.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::value_objects::{namespace_about, parent_path, parent_paths, tag_about};
use tagstore_domain::{Permission, Tag, TagValue, TagstoreError, User};

use crate::application::services::namespace::NamespaceApi;
use crate::application::services::value::TagValueApi;
use crate::application::services::{admin_user, TAG_DESCRIPTION_TAG, TAG_PATH_TAG};
use crate::infrastructure::repositories::{namespaces, objects, permissions, tags, values};

/// A tag as returned by `get`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagInfo {
    pub object_id: Uuid,
    pub description: Option<String>,
}

/// The public API for tags in the model layer.
pub struct TagApi {
    user: User,
}

impl TagApi {
    /// Creates a tag service acting on behalf of `user`
    pub fn new(user: &User) -> Self {
        Self { user: user.clone() }
    }

    /// Creates new tags, including missing parent namespaces.
    ///
    /// Returns `(object id, path)` pairs for the tags created.
    ///
    /// # Errors
    /// `FeatureError` for an empty batch; `DuplicatePath` if a path
    /// already names a tag; `MalformedPath` for invalid paths;
    /// `UnknownPath` for a tag with no parent namespace component.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        if values.is_empty() {
            return Err(TagstoreError::feature("can't create an empty list of tags"));
        }

        let requested: Vec<String> = values.iter().map(|(path, _)| path.clone()).collect();
        let existing = tags::get_tags(conn, Some(&requested), None).await?;
        if !existing.is_empty() {
            let paths: Vec<String> = existing.into_iter().map(|t| t.path).collect();
            return Err(TagstoreError::DuplicatePath(paths.join(", ")));
        }

        for path in &requested {
            if parent_path(path).is_none() {
                return Err(TagstoreError::UnknownPath(vec![path.clone()]));
            }
        }

        // Create missing intermediate namespaces automatically.
        let parents: HashSet<String> = parent_paths(requested.iter().map(String::as_str));
        let namespace_api = NamespaceApi::new(&self.user);
        let missing = namespace_api.missing(conn, &parents).await?;
        if !missing.is_empty() {
            let namespace_values: Vec<(String, String)> = missing
                .into_iter()
                .map(|path| {
                    let description = namespace_about(&path);
                    (path, description)
                })
                .collect();
            namespace_api.create(conn, &namespace_values).await?;
        }

        let parent_list: Vec<String> = parents.into_iter().collect();
        let parent_namespaces = namespaces::get_namespaces(conn, Some(&parent_list), None).await?;
        let by_path: HashMap<&str, i64> = parent_namespaces
            .iter()
            .map(|n| (n.path.as_str(), n.id))
            .collect();

        let objects_api = crate::application::services::object::ObjectApi::new(&self.user);
        let mut system_values: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
        let mut created: Vec<Tag> = Vec::new();
        let mut result = Vec::new();
        for (path, description) in values {
            let parent = parent_path(path).and_then(|p| by_path.get(p)).ok_or_else(|| {
                TagstoreError::UnknownPath(vec![path.clone()])
            })?;
            let about = tag_about(path);
            let object_id = objects_api.create(conn, Some(about.as_str())).await?;
            let tag = tags::create_tag(conn, self.user.id, *parent, object_id, path).await?;
            system_values.insert(
                object_id,
                HashMap::from([
                    (TAG_PATH_TAG.to_string(), TagValue::Text(path.clone())),
                    (
                        TAG_DESCRIPTION_TAG.to_string(),
                        TagValue::Text(description.clone()),
                    ),
                ]),
            );
            result.push((object_id, path.clone()));
            created.push(tag);
        }

        self.create_permissions(conn, &created).await?;

        let admin = admin_user(conn).await?;
        TagValueApi::new(&admin)
            .set_known(conn, &system_values)
            .await?;

        Ok(result)
    }

    /// Creates inherited permission rows for new tags.
    async fn create_permissions(
        &self,
        conn: &mut SqliteConnection,
        created: &[Tag],
    ) -> Result<(), TagstoreError> {
        let parents: Vec<String> = created
            .iter()
            .filter_map(|tag| parent_path(&tag.path))
            .map(str::to_string)
            .collect();
        let parent_permissions = permissions::get_namespace_permissions(conn, &parents).await?;
        for tag in created {
            let permission = match parent_path(&tag.path).and_then(|p| parent_permissions.get(p))
            {
                Some(parent) => Permission::inherit_tag(parent, self.user.id),
                None => Permission::tag_default(self.user.id),
            };
            permissions::create_tag_permission(conn, tag.id, &permission).await?;
        }
        Ok(())
    }

    /// Deletes tags; values and permissions cascade, affected objects are
    /// dirtied, and each tag's about value survives on its object.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let owned = paths.to_vec();
        let deleted = tags::get_tags(conn, Some(&owned), None).await?;

        let system_pairs: Vec<(Uuid, String)> = deleted
            .iter()
            .flat_map(|tag| {
                [
                    (tag.object_id, TAG_DESCRIPTION_TAG.to_string()),
                    (tag.object_id, TAG_PATH_TAG.to_string()),
                ]
            })
            .collect();
        if !system_pairs.is_empty() {
            TagValueApi::new(&self.user)
                .delete(conn, &system_pairs)
                .await?;
        }

        // Objects carrying values for these tags need reindexing once the
        // cascade removes the rows.
        let affected = values::get_object_ids_for_paths(conn, &owned, None).await?;
        let affected: Vec<Uuid> = affected
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        objects::touch_objects(conn, &affected).await?;

        tags::delete_tags(conn, &owned).await?;
        Ok(deleted
            .into_iter()
            .map(|tag| (tag.object_id, tag.path))
            .collect())
    }

    /// Gets information about tags.
    ///
    /// # Errors
    /// `FeatureError` for an empty path list.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
    ) -> Result<HashMap<String, TagInfo>, TagstoreError> {
        if paths.is_empty() {
            return Err(TagstoreError::feature("can't retrieve an empty list of tags"));
        }
        let owned = paths.to_vec();
        let found = tags::get_tags(conn, Some(&owned), None).await?;
        if found.is_empty() {
            return Ok(HashMap::new());
        }

        let descriptions = if with_descriptions {
            let object_ids: Vec<Uuid> = found.iter().map(|t| t.object_id).collect();
            Some(
                TagValueApi::new(&self.user)
                    .get(conn, &object_ids, Some(&[TAG_DESCRIPTION_TAG.to_string()]))
                    .await?,
            )
        } else {
            None
        };

        let mut result = HashMap::new();
        for tag in found {
            let mut info = TagInfo {
                object_id: tag.object_id,
                ..TagInfo::default()
            };
            if let Some(descriptions) = &descriptions {
                info.description = descriptions
                    .get(&tag.object_id)
                    .and_then(|values| values.get(TAG_DESCRIPTION_TAG))
                    .and_then(|entry| match &entry.value {
                        TagValue::Text(text) => Some(text.clone()),
                        _ => None,
                    })
                    .or(Some(String::new()));
            }
            result.insert(tag.path, info);
        }
        Ok(result)
    }

    /// Updates tag descriptions.
    ///
    /// # Errors
    /// `UnknownPath` if a path names no tag.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let paths: Vec<String> = values.keys().cloned().collect();
        let found = tags::get_tags(conn, Some(&paths), None).await?;
        let by_path: HashMap<&str, Uuid> = found
            .iter()
            .map(|t| (t.path.as_str(), t.object_id))
            .collect();

        let mut updates: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
        let mut updated = Vec::new();
        for (path, description) in values {
            let object_id = by_path
                .get(path.as_str())
                .ok_or_else(|| TagstoreError::UnknownPath(vec![path.clone()]))?;
            updates.insert(
                *object_id,
                HashMap::from([(
                    TAG_DESCRIPTION_TAG.to_string(),
                    TagValue::Text(description.clone()),
                )]),
            );
            updated.push((*object_id, path.clone()));
        }

        let admin = admin_user(conn).await?;
        TagValueApi::new(&admin).set_known(conn, &updates).await?;
        Ok(updated)
    }
}
