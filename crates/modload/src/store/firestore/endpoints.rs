//! Firestore REST endpoint URL builders

use modload_common::types::{CollectionPath, DocumentPath};

/// Production Firestore API host
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

/// OAuth scope granting read/write access to Firestore
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Resource name of the default database of `project_id`
pub fn database_name(project_id: &str) -> String {
    format!("projects/{}/databases/(default)", project_id)
}

/// Resource name of a document, as used in request bodies
pub fn document_name(project_id: &str, path: &DocumentPath) -> String {
    format!("{}/documents/{}", database_name(project_id), path)
}

/// Strip the database prefix from a document resource name
pub fn document_path_from_name<'a>(project_id: &str, name: &'a str) -> Option<&'a str> {
    let prefix = format!("{}/documents/", database_name(project_id));
    name.strip_prefix(prefix.as_str())
}

/// List URL for `collection`, returning at most `page_size` documents
pub fn list_documents_url(
    base_url: &str,
    project_id: &str,
    collection: &CollectionPath,
    page_size: usize,
) -> String {
    format!(
        "{}/v1/{}/documents/{}?pageSize={}",
        base_url,
        database_name(project_id),
        encode_path(collection.as_str()),
        page_size
    )
}

/// Commit URL of the default database
pub fn commit_url(base_url: &str, project_id: &str) -> String {
    format!("{}/v1/{}/documents:commit", base_url, database_name(project_id))
}

/// Base URL of a local emulator, e.g. `localhost:8080` -> `http://localhost:8080`
pub fn emulator_base_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
