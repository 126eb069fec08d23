pub mod config;
mod runner;
mod types;

pub use config::{OutputConfig, PipelineConfig};
pub use runner::{list_frames, run_on_folder, run_on_folder_quiet};
pub use types::{BatchReport, FrameOutcome, NoOpReporter, PipelineStage, ProgressReporter};
