use ndarray::Array2;
use tracing::debug;

use crate::consts::{
    BASELINE_CANNY_HIGH_SIGMA, BASELINE_CANNY_LOW_SIGMA, BASELINE_CANNY_SIGMA,
    BASELINE_MAX_STREAK_WIDTH, BASELINE_PEAK_FRACTION,
};
use crate::mask::{DetectionMethod, DetectorMeta, DetectorParams, Mask};
use crate::stats::{mean_stddev, sanitize_image};

use super::config::BaselineConfig;
use super::edges::canny;
use super::hough::{hough_line, hough_line_peaks, merge_edge_bands, rasterize_bands};
use super::{finish_mask, StageOutput, StreakDetector};

/// Global sigma clip followed by Canny edges and a Hough line search.
///
/// Edge thresholds are derived from the global statistics (`mean + 2 std`
/// and `mean + 5 std`), so a flat frame yields no edges and no lines. The
/// two edge lines flanking a streak are merged into one band centred on the
/// streak, and `line_width` pads that band on both sides.
#[derive(Clone, Debug, Default)]
pub struct BaselineDetector {
    config: BaselineConfig,
}

impl BaselineDetector {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    fn run(&self, image: &Array2<f32>) -> StageOutput {
        let (mean, std) = mean_stddev(image);
        let bright = mean + self.config.threshold_sigma as f64 * std;
        debug!(mean, std, bright, "baseline global statistics");

        let low = (mean + BASELINE_CANNY_LOW_SIGMA * std) as f32;
        let high = (mean + BASELINE_CANNY_HIGH_SIGMA * std) as f32;
        let edges = canny(image, BASELINE_CANNY_SIGMA, low, high)?;

        let acc = hough_line(&edges)?;
        let max_votes = acc.max_votes();
        if max_votes == 0 {
            return Ok((Array2::from_elem(image.dim(), false), 0));
        }

        let threshold = BASELINE_PEAK_FRACTION * max_votes as f64;
        let peaks = hough_line_peaks(&acc, threshold, None);
        let bands = merge_edge_bands(&acc, &peaks, threshold, image.dim(), BASELINE_MAX_STREAK_WIDTH);
        debug!(max_votes, peaks = peaks.len(), bands = bands.len(), "baseline hough peaks");
        let mask = rasterize_bands(image.dim(), &bands, self.config.line_width);
        Ok((mask, bands.len()))
    }
}

impl StreakDetector for BaselineDetector {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn detect(&self, image: &Array2<f32>) -> Mask {
        let (clean, replaced) = sanitize_image(image);
        let mut meta = DetectorMeta::new(
            DetectionMethod::BaselineHough,
            DetectorParams::Baseline {
                threshold_sigma: self.config.threshold_sigma,
                line_width: self.config.line_width,
            },
        );
        meta.sanitized_pixels = replaced;
        finish_mask(self.name(), image.dim(), meta, self.run(&clean))
    }
}
