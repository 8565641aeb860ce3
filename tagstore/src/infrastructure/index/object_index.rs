// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The object index: documents in, object IDs out.
//!
//! Wraps the index client with the document and query mapping.  Queries
//! run here do not commit; the sync job commits after each batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use tagstore_domain::{Query, TagstoreError};

use super::client::{IndexClient, DEFAULT_ROW_LIMIT};
use super::mapping::{build_index_query, field_for_json};

/// A full-text object index capable of finding results for queries.
#[derive(Clone)]
pub struct ObjectIndex {
    client: Arc<dyn IndexClient>,
    shards: Option<String>,
}

impl ObjectIndex {
    /// Creates an object index over a client, optionally fanning queries
    /// out over shards.
    pub fn new(client: Arc<dyn IndexClient>, shards: Option<String>) -> Self {
        Self { client, shards }
    }

    /// The underlying client, for the sync job's commit and delete calls.
    pub fn client(&self) -> &Arc<dyn IndexClient> {
        &self.client
    }

    /// Updates indexed tag values: one document per object, carrying the
    /// `paths` list and a dynamic field per `(path, value)`.
    pub async fn update(
        &self,
        values: &HashMap<Uuid, HashMap<String, serde_json::Value>>,
    ) -> Result<(), TagstoreError> {
        let mut documents = Vec::with_capacity(values.len());
        for (object_id, tag_values) in values {
            let mut document = serde_json::Map::new();
            document.insert(
                "fluiddb/id".to_string(),
                serde_json::Value::String(object_id.to_string()),
            );
            document.insert(
                "paths".to_string(),
                serde_json::Value::Array(
                    tag_values
                        .keys()
                        .map(|path| serde_json::Value::String(path.clone()))
                        .collect(),
                ),
            );
            for (path, value) in tag_values {
                let (field, field_value) = field_for_json(path, value, true)?;
                document.insert(field, field_value);
            }
            documents.push(serde_json::Value::Object(document));
        }
        self.client.add(&documents).await
    }

    /// Commits pending index changes.
    pub async fn commit(&self) -> Result<(), TagstoreError> {
        self.client.commit().await
    }

    /// Finds object IDs matching a query.
    pub async fn search(&self, query: &Query) -> Result<HashSet<Uuid>, TagstoreError> {
        let index_query = build_index_query(query.root())?;
        self.client
            .search(&index_query, DEFAULT_ROW_LIMIT, self.shards.as_deref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::index::client::RecordingIndexClient;
    use serde_json::json;

    #[tokio::test]
    async fn update_builds_one_document_per_object() {
        let client = Arc::new(RecordingIndexClient::new());
        let index = ObjectIndex::new(client.clone(), None);

        let object_id = Uuid::new_v4();
        let mut tag_values = HashMap::new();
        tag_values.insert("alice/rating".to_string(), json!(5));
        tag_values.insert("alice/note".to_string(), json!("fine"));
        let mut values = HashMap::new();
        values.insert(object_id, tag_values);

        index.update(&values).await.unwrap();

        let documents = client.documents();
        assert_eq!(documents.len(), 1);
        let document = &documents[0];
        assert_eq!(document["fluiddb/id"], json!(object_id.to_string()));
        assert_eq!(document["alice/rating_tag_number"], json!(5));
        assert_eq!(document["alice/note_tag_raw_str"], json!("fine"));
        let mut paths: Vec<&str> = document["paths"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap())
            .collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["alice/note", "alice/rating"]);
    }

    #[tokio::test]
    async fn search_translates_and_delegates() {
        let client = Arc::new(RecordingIndexClient::new());
        let index = ObjectIndex::new(client.clone(), Some("http://a,http://b".to_string()));

        let object_id = Uuid::new_v4();
        client.set_result("paths:\"a/b\"", HashSet::from([object_id]));

        let query = Query::parse("has a/b").unwrap();
        let found = index.search(&query).await.unwrap();
        assert_eq!(found, HashSet::from([object_id]));
    }

    #[tokio::test]
    async fn search_propagates_translation_errors() {
        let client = Arc::new(RecordingIndexClient::new());
        let index = ObjectIndex::new(client.clone(), None);
        let query = Query::parse(r#"fluiddb/id = "abc" and has a/b"#).unwrap();
        assert!(index.search(&query).await.is_err());
        assert!(client.queries().is_empty());
    }
}
