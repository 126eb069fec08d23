use serde::{Deserialize, Serialize};

use super::metrics::{aggregate, DetectionMetrics, ValidationSummary};

/// Per-frame row of a validation report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameValidation {
    pub file: String,
    #[serde(flatten)]
    pub metrics: DetectionMetrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub detector: String,
    pub dataset: String,
    pub summary: ValidationSummary,
    pub per_frame_details: Vec<FrameValidation>,
}

impl ValidationReport {
    pub fn new(detector: &str, dataset: &str, per_frame_details: Vec<FrameValidation>) -> Self {
        let metrics: Vec<DetectionMetrics> =
            per_frame_details.iter().map(|f| f.metrics.clone()).collect();
        Self {
            detector: detector.to_string(),
            dataset: dataset.to_string(),
            summary: aggregate(&metrics),
            per_frame_details,
        }
    }
}
