pub mod dataset;
pub mod ground_truth;
pub mod metrics;
pub mod report;

pub use dataset::validate_dataset;
pub use ground_truth::{parse_ground_truth, GroundTruth, PixelBox};
pub use metrics::{
    aggregate, compute_iou, compute_pixel_metrics, evaluate_frame, DetectionMetrics,
    PixelMetrics, ValidationSummary,
};
pub use report::{FrameValidation, ValidationReport};
