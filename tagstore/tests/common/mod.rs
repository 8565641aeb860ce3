// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared fixtures for the facade integration tests.

// Not every suite uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;

use tagstore::infrastructure::cache::{CacheClient, InMemoryCacheClient};
use tagstore::infrastructure::index::RecordingIndexClient;
use tagstore::infrastructure::repositories::schema;
use tagstore::presentation::Facade;

/// A facade over an in-memory store, cache and index, with system data
/// and the users `alice` and `bob` in place.
pub struct Harness {
    pub facade: Facade,
    pub cache: Arc<InMemoryCacheClient>,
    pub index: Arc<RecordingIndexClient>,
}

pub async fn harness() -> Harness {
    let cache = Arc::new(InMemoryCacheClient::new());
    let harness = harness_with_cache(cache.clone()).await;
    Harness {
        facade: harness.facade,
        cache,
        index: harness.index,
    }
}

pub struct CacheAgnosticHarness {
    pub facade: Facade,
    pub index: Arc<RecordingIndexClient>,
}

/// Builds the harness over any cache client, so suites can run against a
/// broken cache too.
pub async fn harness_with_cache(cache: Arc<dyn CacheClient>) -> CacheAgnosticHarness {
    let pool = schema::initialize_database("sqlite::memory:")
        .await
        .expect("schema initialises");
    let index = Arc::new(RecordingIndexClient::new());
    let facade = Facade::new(pool, cache, index.clone(), 3600, None);
    facade
        .ensure_system_data()
        .await
        .expect("system data bootstraps");
    facade
        .create_users(
            "fluiddb",
            &[
                (
                    "alice".to_string(),
                    "secret".to_string(),
                    "Alice".to_string(),
                    "alice@example.com".to_string(),
                ),
                (
                    "bob".to_string(),
                    "secret".to_string(),
                    "Bob".to_string(),
                    "bob@example.com".to_string(),
                ),
            ],
        )
        .await
        .expect("test users exist");
    CacheAgnosticHarness { facade, index }
}
