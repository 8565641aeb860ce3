// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Index Client
//!
//! Asynchronous client to the external inverted-index service, behind a
//! trait so the search layer and the sync job can run against a recording
//! double in tests.  The HTTP implementation speaks the Solr-style JSON
//! protocol: documents to `/update/json/docs`, commands to `/update`,
//! queries to `/select`.
//!
//! Index failures surface as `SearchError`; write failures are the
//! caller's to log, since index writes are fire-and-forget relative to the
//! user's transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use tagstore_domain::TagstoreError;

/// Row limit applied to index queries.
pub const DEFAULT_ROW_LIMIT: usize = 1_000_000;

/// The operations the search layer and sync job need from the index.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Adds or replaces documents, keyed by their `fluiddb/id` field.
    async fn add(&self, documents: &[serde_json::Value]) -> Result<(), TagstoreError>;

    /// Commits pending changes so they become searchable.
    async fn commit(&self) -> Result<(), TagstoreError>;

    /// Deletes every document (`deleteByQuery('*:*')`).
    async fn delete_all(&self) -> Result<(), TagstoreError>;

    /// Runs a query and returns the matching object IDs.
    async fn search(
        &self,
        query: &str,
        rows: usize,
        shards: Option<&str>,
    ) -> Result<HashSet<Uuid>, TagstoreError>;
}

/// HTTP client to a Solr-style index core.
pub struct SolrIndexClient {
    http: reqwest::Client,
    url: String,
}

impl SolrIndexClient {
    /// Creates a client for the index core at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    async fn update_command(&self, body: serde_json::Value) -> Result<(), TagstoreError> {
        let response = self
            .http
            .post(format!("{}/update", self.url))
            .query(&[("wt", "json")])
            .json(&body)
            .send()
            .await
            .map_err(|e| TagstoreError::search(format!("index update failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(TagstoreError::search(format!(
                "index update returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IndexClient for SolrIndexClient {
    async fn add(&self, documents: &[serde_json::Value]) -> Result<(), TagstoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        let response = self
            .http
            .post(format!("{}/update/json/docs", self.url))
            .query(&[("wt", "json")])
            .json(documents)
            .send()
            .await
            .map_err(|e| TagstoreError::search(format!("index add failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(TagstoreError::search(format!(
                "index add returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), TagstoreError> {
        // Commits are retried once; a transient failure here would
        // otherwise stall the whole sync run.
        if let Err(first) = self.update_command(serde_json::json!({"commit": {}})).await {
            warn!("index commit failed, retrying: {}", first);
            return self.update_command(serde_json::json!({"commit": {}})).await;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), TagstoreError> {
        self.update_command(serde_json::json!({"delete": {"query": "*:*"}}))
            .await
    }

    async fn search(
        &self,
        query: &str,
        rows: usize,
        shards: Option<&str>,
    ) -> Result<HashSet<Uuid>, TagstoreError> {
        let rows = rows.to_string();
        let mut params = vec![
            ("q", query),
            ("wt", "json"),
            ("rows", rows.as_str()),
            ("fl", "fluiddb/id"),
        ];
        if let Some(shards) = shards {
            params.push(("shards", shards));
        }
        let response = self
            .http
            .get(format!("{}/select", self.url))
            .query(&params)
            .send()
            .await
            .map_err(|e| TagstoreError::search(format!("index query failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(TagstoreError::search(format!(
                "index query returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TagstoreError::search(format!("unreadable index response: {}", e)))?;

        let docs = body["response"]["docs"].as_array().ok_or_else(|| {
            TagstoreError::search("index response is missing response.docs")
        })?;
        let mut object_ids = HashSet::with_capacity(docs.len());
        for doc in docs {
            let id = doc["fluiddb/id"].as_str().ok_or_else(|| {
                TagstoreError::search("index document is missing fluiddb/id")
            })?;
            let id = Uuid::parse_str(id)
                .map_err(|e| TagstoreError::search(format!("bad object id in index: {}", e)))?;
            object_ids.insert(id);
        }
        Ok(object_ids)
    }
}

/// An in-memory index double: records documents and queries, serves
/// canned results.  Used throughout the test suites.
#[derive(Default)]
pub struct RecordingIndexClient {
    documents: Mutex<Vec<serde_json::Value>>,
    queries: Mutex<Vec<String>>,
    results: Mutex<HashMap<String, HashSet<Uuid>>>,
    commits: AtomicUsize,
    deletes: AtomicUsize,
}

impl RecordingIndexClient {
    /// Creates an empty recording index
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result set a query string should return.
    pub fn set_result(&self, query: &str, object_ids: HashSet<Uuid>) {
        self.results.lock().insert(query.to_string(), object_ids);
    }

    /// The queries run so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// The documents added so far.
    pub fn documents(&self) -> Vec<serde_json::Value> {
        self.documents.lock().clone()
    }

    /// How many commits have been issued.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// How many full deletes have been issued.
    pub fn delete_all_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexClient for RecordingIndexClient {
    async fn add(&self, documents: &[serde_json::Value]) -> Result<(), TagstoreError> {
        self.documents.lock().extend(documents.iter().cloned());
        Ok(())
    }

    async fn commit(&self) -> Result<(), TagstoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), TagstoreError> {
        self.documents.lock().clear();
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        _rows: usize,
        _shards: Option<&str>,
    ) -> Result<HashSet<Uuid>, TagstoreError> {
        self.queries.lock().push(query.to_string());
        Ok(self.results.lock().get(query).cloned().unwrap_or_default())
    }
}

/// An index double whose every call fails, for outage-path tests.
#[derive(Default)]
pub struct FailingIndexClient;

#[async_trait]
impl IndexClient for FailingIndexClient {
    async fn add(&self, _documents: &[serde_json::Value]) -> Result<(), TagstoreError> {
        Err(TagstoreError::search("index is down"))
    }

    async fn commit(&self) -> Result<(), TagstoreError> {
        Err(TagstoreError::search("index is down"))
    }

    async fn delete_all(&self) -> Result<(), TagstoreError> {
        Err(TagstoreError::search("index is down"))
    }

    async fn search(
        &self,
        _query: &str,
        _rows: usize,
        _shards: Option<&str>,
    ) -> Result<HashSet<Uuid>, TagstoreError> {
        Err(TagstoreError::search("index is down"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_client_serves_canned_results() {
        let client = RecordingIndexClient::new();
        let object_id = Uuid::new_v4();
        client.set_result("paths:\"a/b\"", HashSet::from([object_id]));

        let found = client.search("paths:\"a/b\"", 10, None).await.unwrap();
        assert_eq!(found, HashSet::from([object_id]));
        let missing = client.search("paths:\"c/d\"", 10, None).await.unwrap();
        assert!(missing.is_empty());
        assert_eq!(
            client.queries(),
            vec!["paths:\"a/b\"".to_string(), "paths:\"c/d\"".to_string()]
        );
    }

    #[tokio::test]
    async fn recording_client_tracks_documents_and_commits() {
        let client = RecordingIndexClient::new();
        client
            .add(&[serde_json::json!({"fluiddb/id": "x"})])
            .await
            .unwrap();
        client.commit().await.unwrap();
        assert_eq!(client.documents().len(), 1);
        assert_eq!(client.commit_count(), 1);

        client.delete_all().await.unwrap();
        assert!(client.documents().is_empty());
        assert_eq!(client.delete_all_count(), 1);
    }
}
