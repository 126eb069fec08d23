use serde::{Deserialize, Serialize};

use crate::consts::{HIGH_CONTAMINATION_FRACTION, SEVERITY_AREA_SCALE};
use crate::frame::Frame;
use crate::mask::{DetectorMeta, Mask};

/// Categorical frame flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityFlag {
    /// The detector reported at least one streak.
    StreakDetected,
    /// More than 5% of the frame is masked.
    HighContamination,
}

/// Streak contamination summary of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameQuality {
    pub file: String,
    pub timestamp_utc: String,
    pub streak_area_fraction: f64,
    pub num_streaks: usize,
    pub severity_score: f64,
    pub flags: Vec<QualityFlag>,
    #[serde(rename = "detector")]
    pub detector_info: DetectorMeta,
}

/// Saturating linear severity: `min(area_fraction * 10, 1)`.
pub fn severity_score(area_fraction: f64) -> f64 {
    (area_fraction * SEVERITY_AREA_SCALE).clamp(0.0, 1.0)
}

pub fn compute_frame_quality(frame: &Frame, mask: &Mask) -> FrameQuality {
    let streak_area_fraction = mask.area_fraction();
    let num_streaks = mask.meta.detected_lines;

    let mut flags = Vec::new();
    if num_streaks > 0 {
        flags.push(QualityFlag::StreakDetected);
    }
    if streak_area_fraction > HIGH_CONTAMINATION_FRACTION {
        flags.push(QualityFlag::HighContamination);
    }

    FrameQuality {
        file: frame.file_name(),
        timestamp_utc: frame
            .timestamp
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        streak_area_fraction,
        num_streaks,
        severity_score: severity_score(streak_area_fraction),
        flags,
        detector_info: mask.meta.clone(),
    }
}
