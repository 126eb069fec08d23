use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::{FrameQuality, NightReport};
use crate::skyglow::OdcOutcome;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Detecting,
    Aggregating,
    EstimatingOdc,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detecting => write!(f, "Detecting streaks"),
            Self::Aggregating => write!(f, "Aggregating night report"),
            Self::EstimatingOdc => write!(f, "Estimating ODC"),
            Self::Writing => write!(f, "Writing reports"),
        }
    }
}

/// What happened to one input file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameOutcome {
    Processed {
        file: String,
        quality: FrameQuality,
    },
    Failed {
        file: String,
        reason: String,
    },
}

impl FrameOutcome {
    pub fn file(&self) -> &str {
        match self {
            Self::Processed { file, .. } | Self::Failed { file, .. } => file,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of a folder run.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub frames: Vec<FrameOutcome>,
    pub night: NightReport,
    pub odc: OdcOutcome,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_failed()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FrameOutcome> {
        self.frames.iter().filter(|f| f.is_failed())
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
