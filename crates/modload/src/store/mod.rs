//! Document storage abstraction
//!
//! The importer needs four things from a document database: listing a
//! collection with a limit, batched deletes, merge-sets, and server-assigned
//! timestamps. [`DocumentStore`] captures exactly that, so the reset engine
//! and importer can run against Firestore or the in-memory store alike.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::{ImportError, Result};
use async_trait::async_trait;
use modload_common::types::{CollectionPath, DocumentPath};
use serde_json::{Map, Value};

/// Maximum number of operations in one committed batch
pub const MAX_BATCH_OPS: usize = 500;

/// Field map of a stored document
pub type Fields = Map<String, Value>;

/// A document returned by [`DocumentStore::list`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub path: DocumentPath,
    pub fields: Fields,
}

/// Merge-set of a single document
///
/// Fields present in `fields` are written; nested maps are merged key by
/// key; everything else already stored is left untouched. Fields listed in
/// `server_timestamps` are set to the commit time by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeWrite {
    pub path: DocumentPath,
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl MergeWrite {
    pub fn new(path: DocumentPath, fields: Fields) -> Self {
        Self {
            path,
            fields,
            server_timestamps: Vec::new(),
        }
    }

    /// Also set `field` to the server's commit timestamp
    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.remove(&field);
        self.server_timestamps.push(field);
        self
    }
}

/// One operation of a batched write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Delete(DocumentPath),
    Merge(MergeWrite),
}

/// Ordered set of writes committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete(path));
        self
    }

    pub fn merge(&mut self, write: MergeWrite) -> &mut Self {
        self.ops.push(WriteOp::Merge(write));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Fail if the batch exceeds [`MAX_BATCH_OPS`]
    pub fn check_size(&self) -> Result<()> {
        if self.ops.len() > MAX_BATCH_OPS {
            return Err(ImportError::BatchTooLarge(self.ops.len()));
        }
        Ok(())
    }
}

/// Storage backend used by the reset engine and importer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch up to `limit` documents stored directly under `collection`
    ///
    /// A collection that does not exist yields an empty list.
    async fn list(&self, collection: &CollectionPath, limit: usize) -> Result<Vec<StoredDocument>>;

    /// Commit all operations of `batch` atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Merge-set a single document
    async fn merge(&self, write: MergeWrite) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.merge(write);
        self.commit(batch).await
    }
}

/// Field map of a JSON object; any other value yields an empty map
pub fn into_fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Leaf field paths touched by a merge of `fields`
///
/// Non-empty maps are descended into so a merge only replaces the leaves it
/// names; empty maps, arrays and scalars are leaves. Segments are joined
/// with `.` and quoted with backticks when they are not plain identifiers.
pub fn merge_field_paths(fields: &Fields) -> Vec<String> {
    fn walk(prefix: Option<&str>, fields: &Fields, out: &mut Vec<String>) {
        for (key, value) in fields {
            let segment = quote_field_segment(key);
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, segment),
                None => segment,
            };
            match value {
                Value::Object(nested) if !nested.is_empty() => walk(Some(&path), nested, out),
                _ => out.push(path),
            }
        }
    }

    let mut out = Vec::new();
    walk(None, fields, &mut out);
    out
}

/// Quote a field path segment unless it is a simple identifier
pub fn quote_field_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_merge_field_paths_descend_into_maps() {
        let f = fields(json!({
            "title": "Quiz",
            "badgeThresholds": {"gold": 90, "silver": 75},
            "tags": ["a"],
            "extra": {}
        }));

        let mut paths = merge_field_paths(&f);
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "badgeThresholds.gold",
                "badgeThresholds.silver",
                "extra",
                "tags",
                "title"
            ]
        );
    }

    #[test]
    fn test_quote_field_segment() {
        assert_eq!(quote_field_segment("countQuizzes"), "countQuizzes");
        assert_eq!(quote_field_segment("_private1"), "_private1");
        assert_eq!(quote_field_segment("1st"), "`1st`");
        assert_eq!(quote_field_segment("image-url"), "`image-url`");
        assert_eq!(quote_field_segment("a`b"), "`a\\`b`");
    }

    #[test]
    fn test_server_timestamp_removes_literal_field() {
        let path = DocumentPath::parse("modules/m1").unwrap();
        let write = MergeWrite::new(path, fields(json!({"updatedAt": "x", "title": "t"})))
            .with_server_timestamp("updatedAt");

        assert!(!write.fields.contains_key("updatedAt"));
        assert_eq!(write.server_timestamps, vec!["updatedAt"]);
    }

    #[test]
    fn test_batch_size_limit() {
        let mut batch = WriteBatch::new();
        for i in 0..=MAX_BATCH_OPS {
            batch.delete(DocumentPath::parse(&format!("videos/v{}", i)).unwrap());
        }
        assert!(matches!(
            batch.check_size(),
            Err(ImportError::BatchTooLarge(501))
        ));
    }
}
