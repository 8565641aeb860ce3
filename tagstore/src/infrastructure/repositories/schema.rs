// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Schema helpers shared by the data-access layer.
//!
//! Applies migrations on start-up so integration tests and services see a
//! consistent database, with foreign keys enabled on every connection.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("ensuring database schema is up to date");

    // sqlx tracks applied migrations in _sqlx_migrations.
    sqlx::migrate!("../migrations").run(pool).await?;

    info!("database schema is up to date");
    Ok(())
}

/// Connects to `database_url`, creating the database file if missing, and
/// runs migrations.
///
/// Foreign-key enforcement is switched on per connection; the cascade and
/// restrict rules in the schema depend on it.  In-memory databases get a
/// single-connection pool, since every new `:memory:` connection would
/// otherwise see its own empty database.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    ensure_schema(&pool).await?;
    Ok(pool)
}
