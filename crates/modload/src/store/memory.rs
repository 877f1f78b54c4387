//! In-memory document store
//!
//! Mirrors the Firestore semantics the importer relies on (collection
//! listing with a limit, atomic batches of at most [`MAX_BATCH_OPS`]
//! operations, deep merge-sets, server timestamps) and records operation
//! counts so tests can assert on how the store was driven. Server timestamps
//! come from a logical clock that advances one second per commit, so two
//! commits never share a timestamp.

use super::{DocumentStore, Fields, MergeWrite, StoredDocument, WriteBatch, WriteOp, MAX_BATCH_OPS};
use crate::error::{ImportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use modload_common::types::{CollectionPath, DocumentPath};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Unix time of the first logical commit (2024-01-01T00:00:00Z)
const CLOCK_EPOCH_SECS: i64 = 1_704_067_200;

/// Counters of operations performed against a [`MemoryStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// `list` calls
    pub lists: usize,
    /// Successful commits, including single merges
    pub commits: usize,
    /// Commits that contained at least one delete
    pub delete_batches: usize,
    /// Individual delete operations
    pub deletes: usize,
    /// Individual merge operations
    pub merges: usize,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<DocumentPath, Fields>,
    ticks: i64,
    stats: StoreStats,
    failing_collections: HashSet<CollectionPath>,
    failing_documents: HashSet<DocumentPath>,
}

/// Document store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a document directly, bypassing stats and the clock
    pub fn insert(&self, path: DocumentPath, fields: Fields) {
        self.state().documents.insert(path, fields);
    }

    /// Current contents of a document
    pub fn get(&self, path: &DocumentPath) -> Option<Fields> {
        self.state().documents.get(path).cloned()
    }

    /// All documents stored directly under `collection`, ordered by path
    pub fn documents_in(&self, collection: &CollectionPath) -> Vec<StoredDocument> {
        self.state()
            .documents
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| StoredDocument {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    /// Total number of stored documents
    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        self.state().stats
    }

    /// Make every later `list` of `collection` fail
    pub fn fail_collection(&self, collection: CollectionPath) {
        self.state().failing_collections.insert(collection);
    }

    /// Make every later commit touching `path` fail
    pub fn fail_document(&self, path: DocumentPath) {
        self.state().failing_documents.insert(path);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &CollectionPath, limit: usize) -> Result<Vec<StoredDocument>> {
        let mut state = self.state();
        state.stats.lists += 1;

        if state.failing_collections.contains(collection) {
            return Err(ImportError::storage(format!(
                "listing '{}' is unavailable",
                collection
            )));
        }

        Ok(state
            .documents
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .take(limit)
            .map(|(path, fields)| StoredDocument {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        batch.check_size()?;
        debug_assert!(batch.len() <= MAX_BATCH_OPS);

        let mut state = self.state();

        // Batches are atomic: reject before touching anything.
        for op in batch.ops() {
            let path = match op {
                WriteOp::Delete(path) => path,
                WriteOp::Merge(write) => &write.path,
            };
            if state.failing_documents.contains(path) {
                return Err(ImportError::storage(format!("write to '{}' was rejected", path)));
            }
        }

        state.ticks += 1;
        let timestamp = logical_timestamp(state.ticks);

        let mut has_delete = false;
        for op in batch.into_ops() {
            match op {
                WriteOp::Delete(path) => {
                    has_delete = true;
                    state.stats.deletes += 1;
                    state.documents.remove(&path);
                }
                WriteOp::Merge(MergeWrite {
                    path,
                    fields,
                    server_timestamps,
                }) => {
                    state.stats.merges += 1;
                    let document = state.documents.entry(path).or_default();
                    deep_merge(document, fields);
                    for field in server_timestamps {
                        document.insert(field, Value::String(timestamp.clone()));
                    }
                }
            }
        }

        state.stats.commits += 1;
        if has_delete {
            state.stats.delete_batches += 1;
        }

        Ok(())
    }
}

fn logical_timestamp(ticks: i64) -> String {
    DateTime::<Utc>::from_timestamp(CLOCK_EPOCH_SECS + ticks, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Merge `incoming` into `target` the way a merge-set does
///
/// Non-empty maps merge recursively into existing maps; any other value
/// (including an empty map) replaces what was stored.
fn deep_merge(target: &mut Fields, incoming: Fields) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) if !nested.is_empty() => {
                deep_merge(existing, nested);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
