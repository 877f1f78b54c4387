//! Service account authentication
//!
//! Google service accounts authenticate with a self-signed RS256 JWT that is
//! exchanged at the key's `token_uri` for a short-lived OAuth2 access token.
//! Tokens are cached and reused until a minute before they expire. The local
//! emulator accepts the fixed `owner` token instead.

use crate::error::{ImportError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use super::endpoints::DATASTORE_SCOPE;

/// Google's OAuth2 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Token accepted by the Firestore emulator
pub const EMULATOR_TOKEN: &str = "owner";

/// Lifetime requested for signed assertions (the maximum Google allows)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh cached tokens this long before they expire
const REFRESH_MARGIN_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Contents of a service account key file (`serviceAccountKey.json`)
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Load a key file; a missing file is reported as such
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ImportError::CredentialsNotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let key: Self =
            serde_json::from_str(&contents).map_err(|e| ImportError::InvalidCredentials {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if key.project_id.is_empty() {
            return Err(ImportError::InvalidCredentials {
                path: path.to_path_buf(),
                reason: "project_id is empty".to_string(),
            });
        }

        Ok(key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Where bearer tokens for Firestore requests come from
pub struct TokenSource {
    kind: TokenKind,
}

enum TokenKind {
    /// Exchange signed assertions for access tokens
    ServiceAccount {
        key: ServiceAccountKey,
        cache: Mutex<Option<CachedToken>>,
    },
    /// Always use the same token
    Static(String),
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self {
            kind: TokenKind::ServiceAccount {
                key,
                cache: Mutex::new(None),
            },
        }
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Static(token.into()),
        }
    }

    pub fn emulator() -> Self {
        Self::fixed(EMULATOR_TOKEN)
    }

    /// Current bearer token, fetching a new one when needed
    pub async fn bearer(&self, http: &Client) -> Result<String> {
        match &self.kind {
            TokenKind::Static(token) => Ok(token.clone()),
            TokenKind::ServiceAccount { key, cache } => {
                let mut cached = cache.lock().await;
                let now = Utc::now();

                if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
                    return Ok(token.value.clone());
                }

                let token = exchange_assertion(http, key, now).await?;
                let value = token.value.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::ServiceAccount { key, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_email", &key.client_email)
                .finish(),
            TokenKind::Static(_) => f.write_str("Static"),
        }
    }
}

/// Sign the JWT assertion for `key` issued at `now`
pub fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        ImportError::auth(format!(
            "private key of {} is not a valid RSA PEM: {}",
            key.client_email, e
        ))
    })?;

    Ok(encode(&header, &claims, &encoding_key)?)
}

async fn exchange_assertion(
    http: &Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken> {
    let assertion = sign_assertion(key, now)?;

    debug!(client_email = %key.client_email, token_uri = %key.token_uri, "Requesting access token");

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ImportError::auth(format!(
            "token endpoint returned {}: {}",
            status,
            body.trim()
        )));
    }

    let token: TokenResponse = response.json().await?;

    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}
