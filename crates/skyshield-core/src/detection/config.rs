use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ADAPTIVE_PERCENTILE, DEFAULT_BASELINE_LINE_WIDTH, DEFAULT_BASELINE_THRESHOLD_SIGMA,
    DEFAULT_IMPROVED_THRESHOLD_SIGMA, DEFAULT_MIN_ASPECT_RATIO, DEFAULT_MIN_STREAK_LENGTH,
};

use super::{AdaptiveDetector, BaselineDetector, ImprovedDetector, StreakDetector};

/// Which streak detector to run, with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DetectorConfig {
    /// Global sigma clip, Canny edges, Hough lines.
    Baseline(BaselineConfig),
    /// Local threshold, elongated-region morphology, edge-restricted Hough.
    Improved(ImprovedConfig),
    /// Percentile threshold and region morphology only.
    Adaptive(AdaptiveConfig),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::Adaptive(AdaptiveConfig::default())
    }
}

impl DetectorConfig {
    pub fn build(&self) -> Box<dyn StreakDetector> {
        match self {
            Self::Baseline(c) => Box::new(BaselineDetector::new(c.clone())),
            Self::Improved(c) => Box::new(ImprovedDetector::new(c.clone())),
            Self::Adaptive(c) => Box::new(AdaptiveDetector::new(c.clone())),
        }
    }

    /// Parse a detector name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "baseline" => Some(Self::Baseline(BaselineConfig::default())),
            "improved" => Some(Self::Improved(ImprovedConfig::default())),
            "adaptive" => Some(Self::Adaptive(AdaptiveConfig::default())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Bright-region threshold in standard deviations above the mean.
    #[serde(default = "default_baseline_sigma")]
    pub threshold_sigma: f32,
    /// Half-width, in pixels, used when rasterizing accepted lines.
    #[serde(default = "default_line_width")]
    pub line_width: f32,
}

fn default_baseline_sigma() -> f32 {
    DEFAULT_BASELINE_THRESHOLD_SIGMA
}
fn default_line_width() -> f32 {
    DEFAULT_BASELINE_LINE_WIDTH
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: DEFAULT_BASELINE_THRESHOLD_SIGMA,
            line_width: DEFAULT_BASELINE_LINE_WIDTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImprovedConfig {
    #[serde(default = "default_improved_sigma")]
    pub threshold_sigma: f32,
    /// Minimum major-axis length of a candidate region, in pixels.
    #[serde(default = "default_min_streak_length")]
    pub min_streak_length: f64,
    /// Minimum major/minor axis ratio of a candidate region.
    #[serde(default = "default_min_aspect_ratio")]
    pub min_aspect_ratio: f64,
}

fn default_improved_sigma() -> f32 {
    DEFAULT_IMPROVED_THRESHOLD_SIGMA
}
fn default_min_streak_length() -> f64 {
    DEFAULT_MIN_STREAK_LENGTH
}
fn default_min_aspect_ratio() -> f64 {
    DEFAULT_MIN_ASPECT_RATIO
}

impl Default for ImprovedConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: DEFAULT_IMPROVED_THRESHOLD_SIGMA,
            min_streak_length: DEFAULT_MIN_STREAK_LENGTH,
            min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Brightness percentile (0..=100) above which pixels are foreground.
    #[serde(default = "default_percentile")]
    pub percentile_threshold: f64,
    /// Minimum region area, in pixels.
    #[serde(default = "default_min_streak_length")]
    pub min_streak_length: f64,
    #[serde(default = "default_min_aspect_ratio")]
    pub min_aspect_ratio: f64,
}

fn default_percentile() -> f64 {
    DEFAULT_ADAPTIVE_PERCENTILE
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            percentile_threshold: DEFAULT_ADAPTIVE_PERCENTILE,
            min_streak_length: DEFAULT_MIN_STREAK_LENGTH,
            min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
        }
    }
}
