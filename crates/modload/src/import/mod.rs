//! Import orchestration
//!
//! Modules are imported one at a time, in the order of `modules.json`. Each
//! module walks the [`ImportStage`] sequence: optionally reset its child
//! collections, merge the module document, merge fiches, videos and quizzes,
//! then record the number of quizzes written. Every write is awaited before
//! the next one is issued.
//!
//! Reset failures are reported and the module carries on; any other error
//! aborts the run, leaving modules already processed in place.

pub mod report;
pub mod stage;

pub use report::{DatasetOutcome, ImportSummary, ModuleReport, ResetOutcome};
pub use stage::ImportStage;

use crate::error::Result;
use crate::fixtures::{Dataset, FixtureLoader, MODULES_FILE};
use crate::normalize::{dataset_record_id, normalize_module, normalize_quiz, record_id};
use crate::reset::reset_collection;
use crate::store::{into_fields, DocumentStore, Fields, MergeWrite};
use colored::Colorize;
use modload_common::types::{CollectionPath, DocumentPath};
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

/// Root collection holding module documents
pub const MODULES_COLLECTION: &str = "modules";

/// Server timestamp refreshed on every write of a module or quiz
pub const UPDATED_AT: &str = "updatedAt";

/// Server timestamp set on every quiz write
pub const CREATED_AT: &str = "createdAt";

/// Module field holding the number of imported quizzes
pub const COUNT_QUIZZES: &str = "countQuizzes";

/// Imports fixture data into a document store
pub struct Importer<'a> {
    store: &'a dyn DocumentStore,
    fixtures: FixtureLoader,
    reset: bool,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn DocumentStore, fixtures: FixtureLoader) -> Self {
        Self {
            store,
            fixtures,
            reset: false,
        }
    }

    /// Empty each module's child collections before importing it
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Import every module listed in `modules.json`
    pub async fn run(&self) -> Result<ImportSummary> {
        let modules = self.fixtures.load_modules().await?;

        info!(
            modules = modules.len(),
            reset = self.reset,
            fixtures_dir = %self.fixtures.dir().display(),
            "Starting import"
        );

        let mut summary = ImportSummary::default();
        for raw in &modules {
            let report = self.import_module(raw).await?;
            summary.modules.push(report);
        }

        info!(
            modules = summary.module_count(),
            fiches = summary.total(Dataset::Fiches),
            videos = summary.total(Dataset::Videos),
            quizzes = summary.total(Dataset::Quizzes),
            reset_failures = summary.reset_failures(),
            "Import finished"
        );

        Ok(summary)
    }

    /// Import one raw module record and its datasets
    pub async fn import_module(&self, raw: &Value) -> Result<ModuleReport> {
        let module_id = record_id(raw, MODULES_FILE)?;
        let module_path = CollectionPath::root(MODULES_COLLECTION)?.doc(&module_id)?;

        let span = info_span!("module", id = %module_id);
        self.walk_stages(raw, &module_id, &module_path)
            .instrument(span)
            .await
    }

    async fn walk_stages(
        &self,
        raw: &Value,
        module_id: &str,
        module_path: &DocumentPath,
    ) -> Result<ModuleReport> {
        let mut report = ModuleReport::new(module_id);
        let mut stage = Some(ImportStage::Start);

        while let Some(current) = stage {
            debug!(stage = %current, "Entering stage");
            report.stages.push(current);

            match current {
                ImportStage::Start => {
                    println!("\n{} Importing module {}", "→".cyan(), module_id.bold());
                }
                ImportStage::Reset => {
                    report.reset = self.reset_children(module_path).await?;
                }
                ImportStage::UpsertModule => {
                    self.upsert_module(raw, module_path).await?;
                }
                ImportStage::ImportFiches | ImportStage::ImportVideos | ImportStage::ImportQuizzes => {
                    if let Some(dataset) = current.dataset() {
                        let outcome = self.import_dataset(dataset, module_id, module_path).await?;
                        report.record(dataset, outcome);
                    }
                }
                ImportStage::FinalizeCounts => {
                    self.finalize_counts(module_path, report.quiz_count()).await?;
                }
                ImportStage::Done => {
                    info!(quizzes = report.quiz_count(), "Module imported");
                }
            }

            stage = current.next(self.reset);
        }

        Ok(report)
    }

    /// Reset fiches, videos and quizzes in turn, stopping at the first failure
    async fn reset_children(&self, module_path: &DocumentPath) -> Result<ResetOutcome> {
        let mut batches = 0;
        let mut deleted = 0;

        for dataset in Dataset::ALL {
            let collection = module_path.collection(dataset.collection_id())?;

            match reset_collection(self.store, &collection).await {
                Ok(stats) => {
                    batches += stats.batches;
                    deleted += stats.deleted;
                }
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Reset failed, continuing with import");
                    println!("  {} partial reset: {}", "⚠".yellow(), e);
                    return Ok(ResetOutcome::Failed {
                        collection,
                        error: e.to_string(),
                    });
                }
            }
        }

        println!("  {} child collections reset ({} deleted)", "✓".green(), deleted);
        Ok(ResetOutcome::Completed { batches, deleted })
    }

    async fn upsert_module(&self, raw: &Value, module_path: &DocumentPath) -> Result<()> {
        let fields = normalize_module(raw).to_fields()?;
        let write = MergeWrite::new(module_path.clone(), fields).with_server_timestamp(UPDATED_AT);
        self.store.merge(write).await
    }

    async fn import_dataset(
        &self,
        dataset: Dataset,
        module_id: &str,
        module_path: &DocumentPath,
    ) -> Result<DatasetOutcome> {
        let Some(records) = self.fixtures.load_dataset(dataset, module_id).await? else {
            println!("  {} no {} file (ok)", "-".dimmed(), dataset);
            return Ok(DatasetOutcome::Missing);
        };

        let collection = module_path.collection(dataset.collection_id())?;
        let mut written = 0;

        for raw in &records {
            let id = dataset_record_id(raw, dataset, module_id)?;
            let write = match dataset {
                Dataset::Quizzes => MergeWrite::new(
                    collection.doc(&id)?,
                    normalize_quiz(raw, module_id).to_fields()?,
                )
                .with_server_timestamp(CREATED_AT)
                .with_server_timestamp(UPDATED_AT),
                Dataset::Fiches | Dataset::Videos => {
                    MergeWrite::new(collection.doc(&id)?, into_fields(raw.clone()))
                }
            };

            self.store.merge(write).await?;
            written += 1;
        }

        debug!(dataset = %dataset, written, "Dataset imported");
        println!("  {} {} imported: {}", "✓".green(), dataset, written);
        Ok(DatasetOutcome::Imported(written))
    }

    async fn finalize_counts(&self, module_path: &DocumentPath, quiz_count: usize) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert(COUNT_QUIZZES.to_string(), Value::from(quiz_count));

        let write = MergeWrite::new(module_path.clone(), fields).with_server_timestamp(UPDATED_AT);
        self.store.merge(write).await
    }
}
