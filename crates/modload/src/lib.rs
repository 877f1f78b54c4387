//! Modload Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads learning-module fixtures (modules with their fiches, videos and
//! quizzes) from JSON files into a Cloud Firestore database.
//!
//! # Overview
//!
//! - **Fixtures**: one JSON array per dataset ([`fixtures`])
//! - **Normalization**: canonical module and quiz documents ([`normalize`])
//! - **Reset**: batched deletion of child collections ([`reset`])
//! - **Import**: per-module stage machine and reports ([`import`])
//! - **Storage**: the [`store::DocumentStore`] trait with Firestore and
//!   in-memory backends ([`store`])
//!
//! # Example
//!
//! ```no_run
//! use modload::fixtures::FixtureLoader;
//! use modload::import::Importer;
//! use modload::store::MemoryStore;
//!
//! # async fn example() -> modload::Result<()> {
//! let store = MemoryStore::new();
//! let summary = Importer::new(&store, FixtureLoader::new("fixtures"))
//!     .with_reset(true)
//!     .run()
//!     .await?;
//! println!("{} modules imported", summary.module_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fixtures;
pub mod import;
pub mod normalize;
pub mod reset;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{ImportError, Result};
pub use import::{ImportSummary, Importer};

use clap::Parser;
use fixtures::FixtureLoader;
use std::path::PathBuf;

/// Modload - import learning modules into Firestore
#[derive(Parser, Debug)]
#[command(name = "modload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Delete each module's fiches, videos and quizzes before importing it
    #[arg(long)]
    pub reset: bool,

    /// Directory containing modules.json and the per-module fixture files
    #[arg(long, env = "MODLOAD_FIXTURES_DIR")]
    pub fixtures_dir: Option<PathBuf>,

    /// Service account key file (defaults to ./serviceAccountKey.json)
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Firestore project (defaults to the key's project_id)
    #[arg(long, env = "MODLOAD_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Connect to the configured store and import every module
pub async fn run(config: &Config) -> Result<ImportSummary> {
    let store = config.open_store()?;

    Importer::new(&store, FixtureLoader::new(&config.fixtures_dir))
        .with_reset(config.reset)
        .run()
        .await
}
