pub mod adaptive;
pub mod baseline;
pub mod components;
pub mod config;
pub mod edges;
pub mod hough;
pub mod improved;
pub mod morphology;

use ndarray::Array2;
use thiserror::Error;

use crate::mask::{DetectionStatus, DetectorMeta, Mask};

pub use adaptive::AdaptiveDetector;
pub use baseline::BaselineDetector;
pub use config::{AdaptiveConfig, BaselineConfig, DetectorConfig, ImprovedConfig};
pub use improved::ImprovedDetector;

/// Failure inside one detector stage. Never leaves a detector: it is turned
/// into a degraded mask instead.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("edge thresholds out of order or non-finite: low={low}, high={high}")]
    InvalidThresholds { low: f32, high: f32 },

    #[error("image has no pixels: {rows}x{cols}")]
    DegenerateImage { rows: usize, cols: usize },
}

/// Image in, contamination mask out.
///
/// Implementations never fail: internal errors produce an all-clear mask
/// whose metadata carries `DetectionStatus::Degraded`.
pub trait StreakDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, image: &Array2<f32>) -> Mask;
}

/// Build the configured detector and run it once.
pub fn detect_configured(config: &DetectorConfig, image: &Array2<f32>) -> Mask {
    config.build().detect(image)
}

/// Output of a detector's fallible core: the binary mask and the count it
/// reports as detected lines.
pub(crate) type StageOutput = Result<(Array2<bool>, usize), DetectionError>;

/// Turn a stage result into a mask, degrading to all-clear on error.
pub(crate) fn finish_mask(
    detector: &'static str,
    shape: (usize, usize),
    mut meta: DetectorMeta,
    output: StageOutput,
) -> Mask {
    match output {
        Ok((mask, lines)) => {
            meta.detected_lines = lines;
            Mask::from_bool(&mask, meta)
        }
        Err(e) => {
            tracing::warn!(detector, error = %e, "detection failed, returning empty mask");
            meta.detected_lines = 0;
            meta.status = DetectionStatus::Degraded(e.to_string());
            Mask::empty(shape, meta)
        }
    }
}
