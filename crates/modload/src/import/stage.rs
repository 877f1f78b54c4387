//! Per-module import stages

use crate::fixtures::Dataset;
use std::fmt;

/// Stage of importing a single module
///
/// Stages run strictly in this order; `Reset` is only visited when the run
/// was started with reset enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportStage {
    Start,
    Reset,
    UpsertModule,
    ImportFiches,
    ImportVideos,
    ImportQuizzes,
    FinalizeCounts,
    Done,
}

impl ImportStage {
    /// Stage following `self`, or `None` after `Done`
    pub fn next(self, reset: bool) -> Option<ImportStage> {
        match self {
            ImportStage::Start if reset => Some(ImportStage::Reset),
            ImportStage::Start | ImportStage::Reset => Some(ImportStage::UpsertModule),
            ImportStage::UpsertModule => Some(ImportStage::ImportFiches),
            ImportStage::ImportFiches => Some(ImportStage::ImportVideos),
            ImportStage::ImportVideos => Some(ImportStage::ImportQuizzes),
            ImportStage::ImportQuizzes => Some(ImportStage::FinalizeCounts),
            ImportStage::FinalizeCounts => Some(ImportStage::Done),
            ImportStage::Done => None,
        }
    }

    /// Full stage sequence of one module, `Start` through `Done`
    pub fn sequence(reset: bool) -> Vec<ImportStage> {
        std::iter::successors(Some(ImportStage::Start), |stage| stage.next(reset)).collect()
    }

    /// Dataset imported by this stage, if any
    pub fn dataset(self) -> Option<Dataset> {
        match self {
            ImportStage::ImportFiches => Some(Dataset::Fiches),
            ImportStage::ImportVideos => Some(Dataset::Videos),
            ImportStage::ImportQuizzes => Some(Dataset::Quizzes),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportStage::Start => "start",
            ImportStage::Reset => "reset",
            ImportStage::UpsertModule => "upsert_module",
            ImportStage::ImportFiches => "import_fiches",
            ImportStage::ImportVideos => "import_videos",
            ImportStage::ImportQuizzes => "import_quizzes",
            ImportStage::FinalizeCounts => "finalize_counts",
            ImportStage::Done => "done",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
