use ndarray::Array2;
use tracing::debug;

use crate::consts::{ADAPTIVE_MIN_OBJECT_SIZE, ADAPTIVE_SMOOTH_SIGMA};
use crate::filters::gaussian_blur_array;
use crate::mask::{DetectionMethod, DetectorMeta, DetectorParams, Mask};
use crate::stats::{image_percentile, sanitize_image};

use super::components::{label_regions, Connectivity};
use super::config::AdaptiveConfig;
use super::morphology::remove_small_objects;
use super::{finish_mask, DetectionError, StageOutput, StreakDetector};

/// Percentile threshold plus region-shape filtering. No line fitting.
#[derive(Clone, Debug, Default)]
pub struct AdaptiveDetector {
    config: AdaptiveConfig,
}

impl AdaptiveDetector {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    fn run(&self, image: &Array2<f32>) -> StageOutput {
        let smoothed = gaussian_blur_array(image, ADAPTIVE_SMOOTH_SIGMA);
        let (rows, cols) = image.dim();
        let threshold = image_percentile(&smoothed, self.config.percentile_threshold)
            .ok_or(DetectionError::DegenerateImage { rows, cols })?;

        let binary = smoothed.mapv(|v| v as f64 > threshold);
        let binary = remove_small_objects(&binary, ADAPTIVE_MIN_OBJECT_SIZE);

        let mut mask = Array2::from_elem(image.dim(), false);
        let mut streaks = 0;
        for region in label_regions(&binary, Connectivity::Eight) {
            if (region.area() as f64) < self.config.min_streak_length {
                continue;
            }
            match region.aspect_ratio() {
                Some(aspect) if aspect >= self.config.min_aspect_ratio => {
                    region.paint(&mut mask);
                    streaks += 1;
                }
                _ => {}
            }
        }
        debug!(threshold, streaks, "adaptive detector regions");
        Ok((mask, streaks))
    }
}

impl StreakDetector for AdaptiveDetector {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn detect(&self, image: &Array2<f32>) -> Mask {
        let (clean, replaced) = sanitize_image(image);
        let mut meta = DetectorMeta::new(
            DetectionMethod::AdaptivePercentile,
            DetectorParams::Adaptive {
                percentile_threshold: self.config.percentile_threshold,
                min_streak_length: self.config.min_streak_length,
                min_aspect_ratio: self.config.min_aspect_ratio,
            },
        );
        meta.sanitized_pixels = replaced;
        finish_mask(self.name(), image.dim(), meta, self.run(&clean))
    }
}
