//! Firestore REST client tests against a mock server

#![allow(clippy::unwrap_used, clippy::expect_used)]

use modload::reset::reset_collection;
use modload::store::firestore::{FirestoreStore, ServiceAccountKey, TokenSource};
use modload::store::{into_fields, DocumentStore, MergeWrite, WriteBatch};
use modload::ImportError;
use modload_common::types::{CollectionPath, DocumentPath};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, body_string_contains, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const DOCUMENTS: &str = "/v1/projects/demo/databases/(default)/documents";
const DOC_PREFIX: &str = "projects/demo/databases/(default)/documents";

fn store(server: &MockServer) -> FirestoreStore {
    FirestoreStore::new(
        server.uri(),
        "demo",
        TokenSource::emulator(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn videos() -> CollectionPath {
    CollectionPath::root("modules")
        .unwrap()
        .doc("m1")
        .unwrap()
        .collection("videos")
        .unwrap()
}

#[tokio::test]
async fn test_list_decodes_documents() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/modules/m1/videos", DOCUMENTS)))
        .and(query_param("pageSize", "500"))
        .and(header("authorization", "Bearer owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{
                "name": format!("{}/modules/m1/videos/v1", DOC_PREFIX),
                "fields": {
                    "title": {"stringValue": "Intro"},
                    "duration": {"integerValue": "90"},
                    "tags": {"arrayValue": {"values": [{"stringValue": "a"}]}}
                },
                "createTime": "2024-01-01T00:00:00Z",
                "updateTime": "2024-01-01T00:00:00Z"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let documents = store(&mock_server).list(&videos(), 500).await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].path.as_str(), "modules/m1/videos/v1");
    assert_eq!(
        serde_json::Value::Object(documents[0].fields.clone()),
        json!({"title": "Intro", "duration": 90, "tags": ["a"]})
    );
}

#[tokio::test]
async fn test_list_missing_collection_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/modules/m1/videos", DOCUMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let documents = store(&mock_server).list(&videos(), 10).await.unwrap();
    assert!(documents.is_empty());
}

#[tokio::test]
async fn test_merge_commits_update_with_mask_and_transforms() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCUMENTS)))
        .and(body_partial_json(json!({
            "writes": [{
                "update": {
                    "name": format!("{}/modules/m1", DOC_PREFIX),
                    "fields": {
                        "title": {"stringValue": "Math"},
                        "countQuizzes": {"integerValue": "3"}
                    }
                },
                "updateMask": {"fieldPaths": ["countQuizzes", "title"]},
                "updateTransforms": [
                    {"fieldPath": "updatedAt", "setToServerValue": "REQUEST_TIME"}
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [{"updateTime": "2024-01-01T00:00:00Z"}],
            "commitTime": "2024-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let write = MergeWrite::new(
        DocumentPath::parse("modules/m1").unwrap(),
        into_fields(json!({"countQuizzes": 3, "title": "Math"})),
    )
    .with_server_timestamp("updatedAt");

    store(&mock_server).merge(write).await.unwrap();
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    store(&mock_server).commit(WriteBatch::new()).await.unwrap();
}

#[tokio::test]
async fn test_commit_error_carries_firestore_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCUMENTS)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "Missing or insufficient permissions.",
                "status": "PERMISSION_DENIED"
            }
        })))
        .mount(&mock_server)
        .await;

    let mut batch = WriteBatch::new();
    batch.delete(DocumentPath::parse("modules/m1/videos/v1").unwrap());

    let err = store(&mock_server).commit(batch).await.unwrap_err();
    match err {
        ImportError::Storage(message) => {
            assert!(message.contains("PERMISSION_DENIED"), "{}", message);
            assert!(message.contains("insufficient permissions"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_reset_over_rest_deletes_until_empty() {
    let mock_server = MockServer::start().await;
    let list_path = format!("{}/modules/m1/videos", DOCUMENTS);

    Mock::given(method("GET"))
        .and(path(list_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [
                {"name": format!("{}/modules/m1/videos/v1", DOC_PREFIX)},
                {"name": format!("{}/modules/m1/videos/v2", DOC_PREFIX)}
            ]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(list_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCUMENTS)))
        .and(body_partial_json(json!({
            "writes": [
                {"delete": format!("{}/modules/m1/videos/v1", DOC_PREFIX)},
                {"delete": format!("{}/modules/m1/videos/v2", DOC_PREFIX)}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stats = reset_collection(&store(&mock_server), &videos()).await.unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.deleted, 2);
}

#[tokio::test]
async fn test_service_account_token_is_exchanged_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/modules/m1/videos", DOCUMENTS)))
        .and(header("authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let key = ServiceAccountKey {
        project_id: "demo".to_string(),
        private_key_id: Some("key-1".to_string()),
        private_key: include_str!("fixtures/test_service_account.pem").to_string(),
        client_email: "loader@demo.iam.gserviceaccount.com".to_string(),
        token_uri: format!("{}/token", mock_server.uri()),
    };

    let store = FirestoreStore::new(
        mock_server.uri(),
        "demo",
        TokenSource::service_account(key),
        Duration::from_secs(5),
    )
    .unwrap();

    store.list(&videos(), 500).await.unwrap();
    store.list(&videos(), 500).await.unwrap();
}

#[tokio::test]
async fn test_rejected_token_exchange_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT Signature."
        })))
        .mount(&mock_server)
        .await;

    let key = ServiceAccountKey {
        project_id: "demo".to_string(),
        private_key_id: None,
        private_key: include_str!("fixtures/test_service_account.pem").to_string(),
        client_email: "loader@demo.iam.gserviceaccount.com".to_string(),
        token_uri: format!("{}/token", mock_server.uri()),
    };

    let store = FirestoreStore::new(
        mock_server.uri(),
        "demo",
        TokenSource::service_account(key),
        Duration::from_secs(5),
    )
    .unwrap();

    let err = store.list(&videos(), 500).await.unwrap_err();
    assert!(matches!(err, ImportError::Auth(ref m) if m.contains("invalid_grant")));
}
