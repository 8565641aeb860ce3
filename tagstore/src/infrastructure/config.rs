// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Service Configuration
//!
//! A single TOML file configures a deployment:
//!
//! ```toml
//! [service]
//! name = "tagstore"
//! log-level = "info"
//!
//! [storage]
//! database-url = "sqlite://tagstore.db"
//!
//! [index]
//! url = "http://localhost:8983/solr/tagstore"
//! shards = ""
//!
//! [cache]
//! url = "redis://127.0.0.1:6379"
//! expire-timeout = 3600
//! ```
//!
//! Missing file means defaults, so tests and local runs need no setup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use tagstore_domain::TagstoreError;

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub name: String,
    #[serde(rename = "log-level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite connection URL for the main store.
    #[serde(rename = "database-url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Base URL of the full-text index core.
    pub url: String,
    /// Optional comma-separated shard URLs used for queries.
    pub shards: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub url: String,
    /// Seconds before cached entries expire.
    #[serde(rename = "expire-timeout")]
    pub expire_timeout: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "tagstore".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tagstore.db".to_string(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr/tagstore".to_string(),
            shards: String::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            expire_timeout: 3600,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from `config_path`, falling back to defaults if
    /// the file does not exist.
    pub async fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, TagstoreError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            warn!(
                "config file not found at {:?}, using defaults",
                config_path
            );
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_path).await.map_err(|e| {
            TagstoreError::IoError(format!(
                "failed to read config file {:?}: {}",
                config_path, e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            TagstoreError::BadRequest(format!(
                "invalid config file {:?}: {}",
                config_path, e
            ))
        })
    }

    /// The shard list for index queries, if configured.
    pub fn index_shards(&self) -> Option<&str> {
        if self.index.shards.trim().is_empty() {
            None
        } else {
            Some(self.index.shards.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let config = ServiceConfig::load("/nonexistent/tagstore.toml")
            .await
            .unwrap();
        assert_eq!(config.cache.expire_timeout, 3600);
        assert!(config.index_shards().is_none());
    }

    #[tokio::test]
    async fn parses_a_full_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagstore.toml");
        std::fs::write(
            &path,
            r#"
[service]
name = "tagstore"
log-level = "debug"

[storage]
database-url = "sqlite://test.db"

[index]
url = "http://index:8983/solr/core"
shards = "http://a/solr,http://b/solr"

[cache]
url = "redis://cache:6379"
expire-timeout = 60
"#,
        )
        .unwrap();

        let config = ServiceConfig::load(&path).await.unwrap();
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.storage.database_url, "sqlite://test.db");
        assert_eq!(config.cache.expire_timeout, 60);
        assert_eq!(
            config.index_shards(),
            Some("http://a/solr,http://b/solr")
        );
    }

    #[tokio::test]
    async fn rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[cache\nexpire-timeout = x").unwrap();
        assert!(ServiceConfig::load(&path).await.is_err());
    }
}
