// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Namespace Service
//!
//! Creating a namespace creates its missing ancestors (with generic
//! descriptions), its inherited permission row, its object, and the
//! system tag values.  Deleting refuses while children exist and keeps
//! the object's about value, so recreating the path reuses the object ID.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use uuid::Uuid;

use tagstore_domain::value_objects::{namespace_about, parent_path, path_hierarchy};
use tagstore_domain::{Namespace, Permission, TagValue, TagstoreError, User};

use crate::application::services::object::ObjectApi;
use crate::application::services::value::TagValueApi;
use crate::application::services::{
    admin_user, NAMESPACE_DESCRIPTION_TAG, NAMESPACE_PATH_TAG,
};
use crate::infrastructure::repositories::{namespaces, permissions};

/// A namespace as returned by `get`, with the optional joins filled in on
/// request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamespaceInfo {
    pub object_id: Uuid,
    pub description: Option<String>,
    pub namespace_names: Option<Vec<String>>,
    pub tag_names: Option<Vec<String>>,
}

/// The public API for namespaces in the model layer.
pub struct NamespaceApi {
    user: User,
}

impl NamespaceApi {
    /// Creates a namespace service acting on behalf of `user`
    pub fn new(user: &User) -> Self {
        Self { user: user.clone() }
    }

    /// Creates new namespaces, including missing intermediate ones.
    ///
    /// Returns `(object id, path)` pairs for the namespaces created.
    ///
    /// # Errors
    /// `DuplicatePath` if a requested path already exists; `MalformedPath`
    /// for invalid paths.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        values: &[(String, String)],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        if values.is_empty() {
            return Ok(vec![]);
        }

        let requested: Vec<String> = values.iter().map(|(path, _)| path.clone()).collect();
        let descriptions: HashMap<&str, &str> = values
            .iter()
            .map(|(path, description)| (path.as_str(), description.as_str()))
            .collect();

        let existing = namespaces::get_namespaces(conn, Some(&requested), None).await?;
        if !existing.is_empty() {
            let paths: Vec<String> = existing.into_iter().map(|n| n.path).collect();
            return Err(TagstoreError::DuplicatePath(paths.join(", ")));
        }

        let hierarchy: Vec<String> = {
            let mut paths: Vec<String> = path_hierarchy(requested.iter().map(String::as_str))
                .into_iter()
                .collect();
            paths.sort();
            paths
        };
        let known = namespaces::get_namespaces(conn, Some(&hierarchy), None).await?;
        let mut by_path: HashMap<String, Namespace> =
            known.into_iter().map(|n| (n.path.clone(), n)).collect();

        let objects = ObjectApi::new(&self.user);
        let mut system_values: HashMap<Uuid, HashMap<String, TagValue>> = HashMap::new();
        let mut created = Vec::new();

        // Sorted order guarantees parents are created before children.
        for path in &hierarchy {
            if by_path.contains_key(path) {
                continue;
            }
            let parent_id = parent_path(path).map(|parent| by_path[parent].id);
            let about = namespace_about(path);
            let description = descriptions
                .get(path.as_str())
                .map(|d| d.to_string())
                .unwrap_or_else(|| about.clone());
            let object_id = objects.create(conn, Some(about.as_str())).await?;
            let namespace =
                namespaces::create_namespace(conn, self.user.id, object_id, path, parent_id)
                    .await?;
            system_values.insert(
                object_id,
                HashMap::from([
                    (NAMESPACE_PATH_TAG.to_string(), TagValue::Text(path.clone())),
                    (
                        NAMESPACE_DESCRIPTION_TAG.to_string(),
                        TagValue::Text(description),
                    ),
                ]),
            );
            created.push(namespace.clone());
            by_path.insert(path.clone(), namespace);
        }

        self.create_permissions(conn, &created).await?;

        let admin = admin_user(conn).await?;
        TagValueApi::new(&admin)
            .set_known(conn, &system_values)
            .await?;

        Ok(created
            .into_iter()
            .map(|namespace| (namespace.object_id, namespace.path))
            .collect())
    }

    /// Creates inherited permission rows for new namespaces.  Children
    /// copy their parent's permissions; root namespaces get the system
    /// defaults.
    async fn create_permissions(
        &self,
        conn: &mut SqliteConnection,
        created: &[Namespace],
    ) -> Result<(), TagstoreError> {
        let parent_paths: Vec<String> = created
            .iter()
            .filter_map(|namespace| parent_path(&namespace.path))
            .map(str::to_string)
            .collect();
        let mut index = permissions::get_namespace_permissions(conn, &parent_paths).await?;

        let mut ordered: Vec<&Namespace> = created.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));
        for namespace in ordered {
            let permission = match parent_path(&namespace.path).and_then(|p| index.get(p)) {
                Some(parent) => Permission::inherit_namespace(parent, self.user.id),
                None => Permission::namespace_default(self.user.id),
            };
            permissions::create_namespace_permission(conn, namespace.id, &permission).await?;
            index.insert(namespace.path.clone(), permission);
        }
        Ok(())
    }

    /// Deletes namespaces, refusing while any has children.  The about
    /// value stays on the object.
    ///
    /// # Errors
    /// `NamespaceNotEmpty` if a namespace still has child namespaces or
    /// tags.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let owned = paths.to_vec();
        let child_namespaces = namespaces::get_child_namespaces(conn, &owned).await?;
        if let Some(child) = child_namespaces.first() {
            return Err(TagstoreError::NamespaceNotEmpty(child.path.clone()));
        }
        let child_tags =
            crate::infrastructure::repositories::tags::get_child_tags(conn, &owned).await?;
        if let Some(child) = child_tags.first() {
            return Err(TagstoreError::NamespaceNotEmpty(child.path.clone()));
        }

        let deleted = namespaces::get_namespaces(conn, Some(&owned), None).await?;
        let system_pairs: Vec<(Uuid, String)> = deleted
            .iter()
            .flat_map(|namespace| {
                [
                    (namespace.object_id, NAMESPACE_DESCRIPTION_TAG.to_string()),
                    (namespace.object_id, NAMESPACE_PATH_TAG.to_string()),
                ]
            })
            .collect();
        if !system_pairs.is_empty() {
            TagValueApi::new(&self.user)
                .delete(conn, &system_pairs)
                .await?;
        }

        namespaces::delete_namespaces(conn, &owned).await?;
        Ok(deleted
            .into_iter()
            .map(|namespace| (namespace.object_id, namespace.path))
            .collect())
    }

    /// Gets information about namespaces, joining the optional fields in
    /// a single traversal.
    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        paths: &[String],
        with_descriptions: bool,
        with_namespaces: bool,
        with_tags: bool,
    ) -> Result<HashMap<String, NamespaceInfo>, TagstoreError> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }
        let owned = paths.to_vec();
        let found = namespaces::get_namespaces(conn, Some(&owned), None).await?;
        if found.is_empty() {
            return Ok(HashMap::new());
        }

        let descriptions = if with_descriptions {
            let object_ids: Vec<Uuid> = found.iter().map(|n| n.object_id).collect();
            let values = TagValueApi::new(&self.user)
                .get(
                    conn,
                    &object_ids,
                    Some(&[NAMESPACE_DESCRIPTION_TAG.to_string()]),
                )
                .await?;
            Some(values)
        } else {
            None
        };

        let child_namespaces = if with_namespaces {
            let children = namespaces::get_child_namespaces(conn, &owned).await?;
            let mut by_parent: HashMap<i64, Vec<String>> = HashMap::new();
            for child in children {
                if let Some(parent_id) = child.parent_id {
                    by_parent.entry(parent_id).or_default().push(child.name);
                }
            }
            Some(by_parent)
        } else {
            None
        };

        let child_tags = if with_tags {
            let children =
                crate::infrastructure::repositories::tags::get_child_tags(conn, &owned).await?;
            let mut by_parent: HashMap<i64, Vec<String>> = HashMap::new();
            for child in children {
                by_parent
                    .entry(child.namespace_id)
                    .or_default()
                    .push(child.name);
            }
            Some(by_parent)
        } else {
            None
        };

        let mut result = HashMap::new();
        for namespace in found {
            let mut info = NamespaceInfo {
                object_id: namespace.object_id,
                ..NamespaceInfo::default()
            };
            if let Some(descriptions) = &descriptions {
                info.description = descriptions
                    .get(&namespace.object_id)
                    .and_then(|values| values.get(NAMESPACE_DESCRIPTION_TAG))
                    .and_then(|entry| match &entry.value {
                        TagValue::Text(text) => Some(text.clone()),
                        _ => None,
                    });
            }
            if let Some(children) = &child_namespaces {
                info.namespace_names =
                    Some(children.get(&namespace.id).cloned().unwrap_or_default());
            }
            if let Some(children) = &child_tags {
                info.tag_names = Some(children.get(&namespace.id).cloned().unwrap_or_default());
            }
            result.insert(namespace.path, info);
        }
        Ok(result)
    }

    /// Updates namespace descriptions.
    ///
    /// # Errors
    /// `UnknownPath` if a path names no namespace.
    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        values: &HashMap<String, String>,
    ) -> Result<Vec<(Uuid, String)>, TagstoreError> {
        let paths: Vec<String> = values.keys().cloned().collect();
        let found = namespaces::get_namespaces(conn, Some(&paths), None).await?;
        let by_path: HashMap<&str, Uuid> = found
            .iter()
            .map(|n| (n.path.as_str(), n.object_id))
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
                    NAMESPACE_DESCRIPTION_TAG.to_string(),
                    TagValue::Text(description.clone()),
                )]),
            );
            updated.push((*object_id, path.clone()));
        }

        let admin = admin_user(conn).await?;
        TagValueApi::new(&admin).set_known(conn, &updates).await?;
        Ok(updated)
    }

    /// The missing namespaces among `paths`.
    pub async fn missing(
        &self,
        conn: &mut SqliteConnection,
        paths: &HashSet<String>,
    ) -> Result<HashSet<String>, TagstoreError> {
        let owned: Vec<String> = paths.iter().cloned().collect();
        let found = namespaces::get_namespaces(conn, Some(&owned), None).await?;
        let existing: HashSet<String> = found.into_iter().map(|n| n.path).collect();
        Ok(paths.difference(&existing).cloned().collect())
    }
}
