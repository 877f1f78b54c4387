//! Cloud Firestore backend over the v1 REST API
//!
//! Listing uses `GET .../documents/{collection}?pageSize=N`; deletes and
//! merge-sets both go through `documents:commit`, one request per batch.
//! A merge-set becomes an `update` write whose mask lists the leaf field
//! paths being written, plus a `REQUEST_TIME` transform for every server
//! timestamp field.

pub mod auth;
pub mod endpoints;
pub mod value;

pub use auth::{ServiceAccountKey, TokenSource};

use crate::error::{ImportError, Result};
use crate::store::{
    merge_field_paths, quote_field_segment, DocumentStore, MergeWrite, StoredDocument, WriteBatch,
    WriteOp,
};
use async_trait::async_trait;
use modload_common::types::{CollectionPath, DocumentPath};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Default timeout for Firestore requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    message: String,
}

/// Firestore document store
#[derive(Debug)]
pub struct FirestoreStore {
    http: Client,
    base_url: String,
    project_id: String,
    tokens: TokenSource,
}

impl FirestoreStore {
    /// Store talking to `base_url` (without the `/v1` suffix)
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        tokens: TokenSource,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            tokens,
        })
    }

    /// Production Firestore authenticated with a service account key
    pub fn with_service_account(
        key: ServiceAccountKey,
        project_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let project_id = project_id.unwrap_or_else(|| key.project_id.clone());
        Self::new(
            endpoints::FIRESTORE_BASE_URL,
            project_id,
            TokenSource::service_account(key),
            timeout,
        )
    }

    /// Local emulator at `host` (`FIRESTORE_EMULATOR_HOST`)
    pub fn emulator(host: &str, project_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::new(
            endpoints::emulator_base_url(host),
            project_id,
            TokenSource::emulator(),
            timeout,
        )
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encode_write(&self, op: &WriteOp) -> Value {
        match op {
            WriteOp::Delete(path) => {
                json!({ "delete": endpoints::document_name(&self.project_id, path) })
            }
            WriteOp::Merge(write) => self.encode_merge(write),
        }
    }

    fn encode_merge(&self, write: &MergeWrite) -> Value {
        let mut encoded = json!({
            "update": {
                "name": endpoints::document_name(&self.project_id, &write.path),
                "fields": value::encode_fields(&write.fields),
            },
            "updateMask": { "fieldPaths": merge_field_paths(&write.fields) },
        });

        if !write.server_timestamps.is_empty() {
            let transforms: Vec<Value> = write
                .server_timestamps
                .iter()
                .map(|field| {
                    json!({
                        "fieldPath": quote_field_segment(field),
                        "setToServerValue": "REQUEST_TIME",
                    })
                })
                .collect();
            encoded["updateTransforms"] = Value::Array(transforms);
        }

        encoded
    }

    fn decode_document(&self, raw: RawDocument) -> Result<StoredDocument> {
        let path = endpoints::document_path_from_name(&self.project_id, &raw.name).ok_or_else(|| {
            ImportError::storage(format!(
                "document '{}' is outside project '{}'",
                raw.name, self.project_id
            ))
        })?;

        Ok(StoredDocument {
            path: DocumentPath::parse(path)?,
            fields: value::decode_fields(&raw.fields)?,
        })
    }
}

/// Turn a non-success response into a storage error carrying Firestore's message
async fn check_response(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.status.is_empty() => {
            format!("{} ({})", envelope.error.message, envelope.error.status)
        }
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    };

    Err(ImportError::storage(format!("{} failed with {}: {}", action, status, detail)))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &CollectionPath, limit: usize) -> Result<Vec<StoredDocument>> {
        let url = endpoints::list_documents_url(&self.base_url, &self.project_id, collection, limit);
        let token = self.tokens.bearer(&self.http).await?;

        debug!(collection = %collection, limit, "Listing documents");

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let response = check_response(response, &format!("listing '{}'", collection)).await?;
        let listed: ListDocumentsResponse = response.json().await?;

        listed
            .documents
            .into_iter()
            .take(limit)
            .map(|raw| self.decode_document(raw))
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        batch.check_size()?;
        if batch.is_empty() {
            return Ok(());
        }

        let writes: Vec<Value> = batch.ops().iter().map(|op| self.encode_write(op)).collect();
        let url = endpoints::commit_url(&self.base_url, &self.project_id);
        let token = self.tokens.bearer(&self.http).await?;

        debug!(ops = writes.len(), "Committing batch");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "writes": writes }))
            .send()
            .await?;
        check_response(response, "commit").await?;

        Ok(())
    }
}
