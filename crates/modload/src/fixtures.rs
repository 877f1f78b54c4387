//! Fixture file loading
//!
//! Every dataset lives in one JSON array file inside the fixtures directory:
//! `modules.json` lists the modules, and each module may have
//! `fiches_{id}.json`, `videos_{id}.json` and `quizzes_{id}.json`. A missing
//! per-module file means the module has no records of that kind; a missing
//! `modules.json` is an error.

use crate::error::{ImportError, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File listing the modules to import
pub const MODULES_FILE: &str = "modules.json";

/// Child datasets of a module, in import order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Fiches,
    Videos,
    Quizzes,
}

impl Dataset {
    /// All datasets in the order they are reset and imported
    pub const ALL: [Dataset; 3] = [Dataset::Fiches, Dataset::Videos, Dataset::Quizzes];

    /// Human-readable name used in progress output
    pub fn label(self) -> &'static str {
        match self {
            Dataset::Fiches => "fiches",
            Dataset::Videos => "videos",
            Dataset::Quizzes => "quizzes",
        }
    }

    /// Child collection id under a module document
    pub fn collection_id(self) -> &'static str {
        match self {
            Dataset::Fiches => "fichesSynthese",
            Dataset::Videos => "videos",
            Dataset::Quizzes => "quizzes",
        }
    }

    /// Fixture file name for `module_id`, e.g. `quizzes_m1.json`
    pub fn file_name(self, module_id: &str) -> String {
        format!("{}_{}.json", self.label(), module_id)
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reads fixture files from a directory
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    dir: PathBuf,
}

impl FixtureLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn modules_path(&self) -> PathBuf {
        self.dir.join(MODULES_FILE)
    }

    pub fn dataset_path(&self, dataset: Dataset, module_id: &str) -> PathBuf {
        self.dir.join(dataset.file_name(module_id))
    }

    /// Load the module list; fails when the file is missing
    pub async fn load_modules(&self) -> Result<Vec<Value>> {
        let path = self.modules_path();
        read_array(&path)
            .await?
            .ok_or(ImportError::FixtureNotFound(path))
    }

    /// Load one dataset of a module; `None` when its file does not exist
    pub async fn load_dataset(&self, dataset: Dataset, module_id: &str) -> Result<Option<Vec<Value>>> {
        read_array(&self.dataset_path(dataset, module_id)).await
    }
}

async fn read_array(path: &Path) -> Result<Option<Vec<Value>>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Fixture file absent");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let records: Vec<Value> =
        serde_json::from_str(&contents).map_err(|source| ImportError::FixtureParse {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(path = %path.display(), records = records.len(), "Loaded fixture");
    Ok(Some(records))
}
