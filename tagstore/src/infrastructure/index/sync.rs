// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Index Synchronisation
//!
//! The index is eventually consistent with the main store.  Mutations
//! append to the dirty-object log inside the user's transaction; this
//! out-of-band job folds logged objects into the index:
//!
//! - **Clean build** deletes every document, then re-imports all objects.
//! - **Delta build** imports only objects with un-indexed dirty rows and
//!   marks those rows indexed afterwards.  Rows are marked, not deleted,
//!   so a run can be replayed.
//! - **Batch touch** re-dirties object IDs listed in a file in bounded
//!   batches, forcing reindexing of subsets.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use tagstore_domain::TagstoreError;

use crate::infrastructure::repositories::objects::{
    get_object_field_values, mark_objects_indexed, touch_objects,
};
use crate::infrastructure::repositories::db_err;

use super::object_index::ObjectIndex;

/// Documents per index update batch.
const MAX_DOCUMENTS: usize = 1000;

async fn import(
    pool: &SqlitePool,
    index: &ObjectIndex,
    clean: bool,
) -> Result<(usize, Vec<Uuid>), TagstoreError> {
    let mut conn = pool.acquire().await.map_err(db_err)?;
    let rows = get_object_field_values(&mut conn, clean).await?;
    drop(conn);

    let mut documents: HashMap<Uuid, HashMap<String, serde_json::Value>> = HashMap::new();
    let mut imported_objects = Vec::new();
    let mut document_count = 0;

    // Rows arrive ordered by object, so a batch boundary never splits an
    // object's values.
    for (object_id, path, value) in rows {
        if !documents.contains_key(&object_id) {
            if documents.len() >= MAX_DOCUMENTS {
                index.update(&documents).await?;
                document_count += documents.len();
                documents.clear();
            }
            imported_objects.push(object_id);
        }
        documents.entry(object_id).or_default().insert(path, value);
    }
    if !documents.is_empty() {
        document_count += documents.len();
        index.update(&documents).await?;
    }
    index.commit().await?;
    Ok((document_count, imported_objects))
}

/// Rebuilds the index from scratch: deletes every document, then imports
/// all objects.  Returns the number of documents created.
pub async fn build_index(pool: &SqlitePool, index: &ObjectIndex) -> Result<usize, TagstoreError> {
    info!("starting clean index build");
    index.client().delete_all().await?;
    index.commit().await?;
    let (documents, _) = import(pool, index, true).await?;
    info!("clean index build complete: {} documents", documents);
    Ok(documents)
}

/// Imports objects dirtied since the last run and marks the consumed
/// dirty rows indexed.  Returns the number of documents updated.
pub async fn update_index(pool: &SqlitePool, index: &ObjectIndex) -> Result<usize, TagstoreError> {
    let (documents, objects) = import(pool, index, false).await?;
    // Marking happens only after the index accepted the batch; a failure
    // before this point leaves the rows un-indexed and the run replayable.
    let mut conn = pool.acquire().await.map_err(db_err)?;
    mark_objects_indexed(&mut conn, &objects).await?;
    info!("delta index build complete: {} documents", documents);
    Ok(documents)
}

/// Re-touches the object IDs listed in `objects_file`, `max_objects` per
/// batch, sleeping `interval` between batches.  Unparseable lines are
/// logged and skipped.
pub async fn batch_index<F, Fut>(
    pool: &SqlitePool,
    objects_file: &Path,
    interval: Duration,
    max_objects: usize,
    sleep: F,
) -> Result<usize, TagstoreError>
where
    F: Fn(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let content = tokio::fs::read_to_string(objects_file).await?;

    let mut object_ids = Vec::new();
    let mut batch = 0usize;
    let mut touched = 0usize;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Uuid::parse_str(line) {
            Ok(object_id) => object_ids.push(object_id),
            Err(_) => {
                error!("invalid object id: {:?}", line);
                continue;
            }
        }
        if object_ids.len() >= max_objects {
            let mut conn = pool.acquire().await.map_err(db_err)?;
            touch_objects(&mut conn, &object_ids).await?;
            touched += object_ids.len();
            object_ids.clear();
            batch += 1;
            info!("batch {} done, sleeping until next batch", batch);
            sleep(interval).await;
        }
    }
    if !object_ids.is_empty() {
        let mut conn = pool.acquire().await.map_err(db_err)?;
        touch_objects(&mut conn, &object_ids).await?;
        touched += object_ids.len();
    }
    info!("all objects processed");
    Ok(touched)
}
