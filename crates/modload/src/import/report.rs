//! Import reports

use super::stage::ImportStage;
use crate::fixtures::Dataset;
use modload_common::types::CollectionPath;

/// Result of resetting a module's child collections
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResetOutcome {
    /// Reset was not requested
    #[default]
    Skipped,
    /// Every child collection was emptied
    Completed { batches: usize, deleted: usize },
    /// A collection could not be reset; later collections were left alone
    Failed {
        collection: CollectionPath,
        error: String,
    },
}

impl ResetOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResetOutcome::Failed { .. })
    }
}

/// Result of importing one dataset of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetOutcome {
    /// The dataset has no fixture file
    #[default]
    Missing,
    /// This many records were written
    Imported(usize),
}

impl DatasetOutcome {
    /// Records written; zero for a missing file
    pub fn count(self) -> usize {
        match self {
            DatasetOutcome::Missing => 0,
            DatasetOutcome::Imported(count) => count,
        }
    }
}

/// What happened while importing one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub module_id: String,
    /// Stages in the order they ran
    pub stages: Vec<ImportStage>,
    pub reset: ResetOutcome,
    pub fiches: DatasetOutcome,
    pub videos: DatasetOutcome,
    pub quizzes: DatasetOutcome,
}

impl ModuleReport {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            stages: Vec::new(),
            reset: ResetOutcome::Skipped,
            fiches: DatasetOutcome::Missing,
            videos: DatasetOutcome::Missing,
            quizzes: DatasetOutcome::Missing,
        }
    }

    pub fn outcome(&self, dataset: Dataset) -> DatasetOutcome {
        match dataset {
            Dataset::Fiches => self.fiches,
            Dataset::Videos => self.videos,
            Dataset::Quizzes => self.quizzes,
        }
    }

    pub(crate) fn record(&mut self, dataset: Dataset, outcome: DatasetOutcome) {
        match dataset {
            Dataset::Fiches => self.fiches = outcome,
            Dataset::Videos => self.videos = outcome,
            Dataset::Quizzes => self.quizzes = outcome,
        }
    }

    /// Value written to the module's `countQuizzes`
    pub fn quiz_count(&self) -> usize {
        self.quizzes.count()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub modules: Vec<ModuleReport>,
}

impl ImportSummary {
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Records of `dataset` written across all modules
    pub fn total(&self, dataset: Dataset) -> usize {
        self.modules
            .iter()
            .map(|m| m.outcome(dataset).count())
            .sum()
    }

    /// Modules whose reset failed
    pub fn reset_failures(&self) -> usize {
        self.modules.iter().filter(|m| m.reset.is_failed()).count()
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let mut m1 = ModuleReport::new("m1");
        m1.record(Dataset::Quizzes, DatasetOutcome::Imported(5));
        m1.record(Dataset::Fiches, DatasetOutcome::Imported(2));
        let mut m2 = ModuleReport::new("m2");
        m2.record(Dataset::Quizzes, DatasetOutcome::Imported(1));

        let summary = ImportSummary {
            modules: vec![m1, m2],
        };

        assert_eq!(summary.module_count(), 2);
        assert_eq!(summary.total(Dataset::Quizzes), 6);
        assert_eq!(summary.total(Dataset::Videos), 0);
        assert_eq!(summary.module("m2").map(ModuleReport::quiz_count), Some(1));
        assert_eq!(summary.reset_failures(), 0);
    }

    #[test]
    fn test_missing_dataset_counts_zero() {
        let report = ModuleReport::new("m1");
        assert_eq!(report.quiz_count(), 0);
        assert_eq!(report.outcome(Dataset::Videos), DatasetOutcome::Missing);
    }
}
