//! Collection reset
//!
//! Deletes every document directly under a collection, one bounded batch at
//! a time, until a listing comes back empty.

use crate::error::{ImportError, Result};
use crate::store::{DocumentStore, WriteBatch, MAX_BATCH_OPS};
use modload_common::types::CollectionPath;
use tracing::debug;

/// What a reset removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetStats {
    /// Committed delete batches
    pub batches: usize,
    /// Deleted documents
    pub deleted: usize,
}

/// Delete all documents of `collection`
///
/// Errors from listing or committing are returned as [`ImportError::Reset`].
/// Documents deleted by earlier batches stay deleted.
pub async fn reset_collection(
    store: &dyn DocumentStore,
    collection: &CollectionPath,
) -> Result<ResetStats> {
    let mut stats = ResetStats::default();

    loop {
        let documents = store
            .list(collection, MAX_BATCH_OPS)
            .await
            .map_err(|e| ImportError::reset(collection.clone(), e))?;

        if documents.is_empty() {
            break;
        }

        let mut batch = WriteBatch::new();
        for document in documents {
            batch.delete(document.path);
        }
        let size = batch.len();

        store
            .commit(batch)
            .await
            .map_err(|e| ImportError::reset(collection.clone(), e))?;

        stats.batches += 1;
        stats.deleted += size;
        debug!(collection = %collection, batch = stats.batches, size, "Deleted batch");
    }

    Ok(stats)
}
