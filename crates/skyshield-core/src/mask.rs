use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Binary contamination mask produced by one detector call.
///
/// `data` has the same shape as the image it was computed from; 0 is clean,
/// any nonzero value is contaminated.
#[derive(Clone, Debug)]
pub struct Mask {
    pub data: Array2<u8>,
    pub meta: DetectorMeta,
}

impl Mask {
    /// All-clear mask of the given `(height, width)` shape.
    pub fn empty(shape: (usize, usize), meta: DetectorMeta) -> Self {
        Self {
            data: Array2::zeros(shape),
            meta,
        }
    }

    pub fn from_bool(mask: &Array2<bool>, meta: DetectorMeta) -> Self {
        Self {
            data: mask.mapv(u8::from),
            meta,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn contaminated_pixels(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Contaminated pixels / total pixels, in [0, 1]. Empty masks give 0.
    pub fn area_fraction(&self) -> f64 {
        let total = self.data.len();
        if total == 0 {
            return 0.0;
        }
        self.contaminated_pixels() as f64 / total as f64
    }
}

/// Which detector produced a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[serde(rename = "baseline_hough")]
    BaselineHough,
    #[serde(rename = "improved_morphology_hough")]
    ImprovedMorphologyHough,
    #[serde(rename = "adaptive_percentile")]
    AdaptivePercentile,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaselineHough => write!(f, "Baseline (sigma clip + Hough)"),
            Self::ImprovedMorphologyHough => write!(f, "Improved (morphology + Hough)"),
            Self::AdaptivePercentile => write!(f, "Adaptive (percentile + morphology)"),
        }
    }
}

/// Parameters a detector ran with, recorded alongside its output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorParams {
    Baseline {
        threshold_sigma: f32,
        line_width: f32,
    },
    Improved {
        threshold_sigma: f32,
        min_streak_length: f64,
        min_aspect_ratio: f64,
    },
    Adaptive {
        percentile_threshold: f64,
        min_streak_length: f64,
        min_aspect_ratio: f64,
    },
}

/// Whether the detector completed every stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DetectionStatus {
    #[default]
    Complete,
    /// A stage failed; the mask is the documented degraded result.
    Degraded(String),
}

/// Metadata attached to every mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorMeta {
    pub method: DetectionMethod,
    pub parameters: DetectorParams,
    /// Number of line-like features reported by the detector.
    pub detected_lines: usize,
    /// Elongated regions found by the morphology stage (Improved only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_regions: Option<usize>,
    /// Non-finite input pixels replaced before detection.
    #[serde(default)]
    pub sanitized_pixels: usize,
    #[serde(default)]
    pub status: DetectionStatus,
}

impl DetectorMeta {
    pub fn new(method: DetectionMethod, parameters: DetectorParams) -> Self {
        Self {
            method,
            parameters,
            detected_lines: 0,
            candidate_regions: None,
            sanitized_pixels: 0,
            status: DetectionStatus::Complete,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, DetectionStatus::Degraded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> DetectorMeta {
        DetectorMeta::new(
            DetectionMethod::AdaptivePercentile,
            DetectorParams::Adaptive {
                percentile_threshold: 98.0,
                min_streak_length: 30.0,
                min_aspect_ratio: 3.0,
            },
        )
    }

    #[test]
    fn area_fraction_counts_nonzero_pixels() {
        let mut m = Mask::empty((4, 5), meta());
        m.data[[0, 0]] = 1;
        m.data[[3, 4]] = 255;
        assert_eq!(m.contaminated_pixels(), 2);
        assert!((m.area_fraction() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_sized_mask_has_zero_fraction() {
        let m = Mask::empty((0, 0), meta());
        assert_eq!(m.area_fraction(), 0.0);
    }

    #[test]
    fn degraded_status_is_reported() {
        let mut meta = meta();
        assert!(!meta.is_degraded());
        meta.status = DetectionStatus::Degraded("hough failed".into());
        assert!(meta.is_degraded());
    }
}
