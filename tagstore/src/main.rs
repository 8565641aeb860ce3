// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Operational entry points: database initialisation and the index
//! synchronisation job.  The HTTP frontend lives elsewhere and consumes
//! the facade; this binary covers what operators run by hand or from a
//! scheduler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use tagstore::application::services::system::create_system_data;
use tagstore::infrastructure::config::ServiceConfig;
use tagstore::infrastructure::index::sync::{batch_index, build_index, update_index};
use tagstore::infrastructure::index::{ObjectIndex, SolrIndexClient};
use tagstore::infrastructure::repositories::schema;
use tagstore_bootstrap::{init_logging, ExitCode, ShutdownCoordinator};

#[derive(Parser)]
#[command(name = "tagstore")]
#[command(about = "Tagstore - typed, tag-based metadata store")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "tagstore.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and system data
    Init,
    /// Remove opaque payloads that no tag value links any more
    Gc,
    /// Index synchronisation
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Clean rebuild: delete every document, then import all objects
    Build,
    /// Delta import: index objects dirtied since the last run
    Update,
    /// Re-touch object IDs listed in a file, in bounded batches
    Batch {
        /// File with one object ID per line
        file: PathBuf,
        /// Minutes to sleep between batches
        #[arg(long, default_value_t = 1)]
        interval: u64,
        /// Objects per batch
        #[arg(long, default_value_t = 1000)]
        batch: usize,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServiceConfig::load(&cli.config).await?;
    let level = if cli.verbose {
        "debug"
    } else {
        &config.service.log_level
    };
    init_logging(level);

    let pool = schema::initialize_database(&config.storage.database_url).await?;

    match cli.command {
        Commands::Init => {
            let mut conn = pool.acquire().await?;
            create_system_data(&mut conn).await?;
            info!("system data is in place");
        }
        Commands::Gc => {
            let mut conn = pool.acquire().await?;
            let removed =
                tagstore::infrastructure::repositories::values::prune_orphan_opaque_values(
                    &mut conn,
                )
                .await?;
            info!("removed {} orphan opaque values", removed);
        }
        Commands::Index { command } => {
            let client = Arc::new(SolrIndexClient::new(&config.index.url));
            let index = ObjectIndex::new(client, config.index_shards().map(str::to_string));
            match command {
                IndexCommands::Build => {
                    let documents = build_index(&pool, &index).await?;
                    info!("indexed {} documents", documents);
                }
                IndexCommands::Update => {
                    let documents = update_index(&pool, &index).await?;
                    info!("updated {} documents", documents);
                }
                IndexCommands::Batch {
                    file,
                    interval,
                    batch,
                } => {
                    // Long-running; stop cleanly between batches on ctrl-c.
                    // Partial progress stays in the dirty log either way.
                    let shutdown = ShutdownCoordinator::new();
                    shutdown.listen_for_signals();
                    tokio::select! {
                        result = batch_index(
                            &pool,
                            &file,
                            Duration::from_secs(interval * 60),
                            batch,
                            tokio::time::sleep,
                        ) => {
                            info!("touched {} objects", result?);
                        }
                        _ = shutdown.cancelled() => {
                            info!("batch touch interrupted");
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {:#}", error);
        ExitCode::Failure.exit();
    }
}
