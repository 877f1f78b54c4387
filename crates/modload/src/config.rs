//! Configuration for modload runs
//!
//! Settings come from defaults, then environment variables, then
//! command-line flags, each layer overriding the previous one.

use crate::error::{ImportError, Result};
use crate::store::firestore::{FirestoreStore, ServiceAccountKey};
use crate::Cli;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Service account key used when none is configured
pub const DEFAULT_CREDENTIALS_PATH: &str = "./serviceAccountKey.json";

/// Fixtures are read from the working directory by default
pub const DEFAULT_FIXTURES_DIR: &str = ".";

pub use crate::store::firestore::DEFAULT_TIMEOUT_SECS;

pub const ENV_FIXTURES_DIR: &str = "MODLOAD_FIXTURES_DIR";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_PROJECT_ID: &str = "MODLOAD_PROJECT_ID";
pub const ENV_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
pub const ENV_TIMEOUT_SECS: &str = "MODLOAD_TIMEOUT_SECS";

/// Settings of one import run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `modules.json` and the per-module fixtures
    pub fixtures_dir: PathBuf,

    /// Service account key file
    pub credentials_path: PathBuf,

    /// Project to write to; defaults to the key's project
    pub project_id: Option<String>,

    /// Firestore emulator `host:port`, when targeting the emulator
    pub emulator_host: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Reset child collections before importing
    pub reset: bool,
}

impl Config {
    /// Configuration with default values
    pub fn new() -> Self {
        Self {
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            project_id: None,
            emulator_host: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            reset: false,
        }
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by the variables `lookup` returns
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::new();

        if let Some(dir) = var(ENV_FIXTURES_DIR) {
            config.fixtures_dir = PathBuf::from(dir);
        }

        if let Some(path) = var(ENV_CREDENTIALS) {
            config.credentials_path = PathBuf::from(path);
        }

        config.project_id = var(ENV_PROJECT_ID);
        config.emulator_host = var(ENV_EMULATOR_HOST);

        if let Some(timeout) = var(ENV_TIMEOUT_SECS) {
            config.timeout_secs = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ImportError::config(format!(
                        "{} must be a positive number of seconds, got '{}'",
                        ENV_TIMEOUT_SECS, timeout
                    ))
                })?;
        }

        Ok(config)
    }

    /// Apply command-line flags on top of this configuration
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.fixtures_dir {
            self.fixtures_dir = dir.clone();
        }
        if let Some(path) = &cli.credentials {
            self.credentials_path = path.clone();
        }
        if let Some(project_id) = &cli.project_id {
            self.project_id = Some(project_id.clone());
        }
        self.reset = cli.reset;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load credentials and connect to Firestore or its emulator
    ///
    /// The credential file is required in both cases; against the emulator
    /// only its project id is used.
    pub fn open_store(&self) -> Result<FirestoreStore> {
        let key = ServiceAccountKey::from_file(&self.credentials_path)?;

        match &self.emulator_host {
            Some(host) => {
                let project_id = self.project_id.clone().unwrap_or(key.project_id);
                info!(host = %host, project_id = %project_id, "Using Firestore emulator");
                FirestoreStore::emulator(host, project_id, self.timeout())
            }
            None => {
                let store =
                    FirestoreStore::with_service_account(key, self.project_id.clone(), self.timeout())?;
                info!(project_id = %store.project_id(), "Using Firestore");
                Ok(store)
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
