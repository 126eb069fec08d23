use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::consts::{
    IMPROVED_BLOCK_SIZE, IMPROVED_CANNY_HIGH, IMPROVED_CANNY_LOW, IMPROVED_CANNY_SIGMA,
    IMPROVED_LINE_WIDTH, IMPROVED_MAX_PEAKS, IMPROVED_MIN_OBJECT_SIZE, IMPROVED_PEAK_FRACTION,
    IMPROVED_SMOOTH_SIGMA, IMPROVED_THRESHOLD_OFFSET,
};
use crate::filters::{gaussian_blur_array, gaussian_local_threshold};
use crate::mask::{DetectionMethod, DetectorMeta, DetectorParams, Mask};
use crate::stats::sanitize_image;

use super::components::{label_regions, Connectivity};
use super::config::ImprovedConfig;
use super::edges::canny;
use super::hough::{hough_line, hough_line_peaks, rasterize_lines, HoughLine};
use super::morphology::remove_small_objects;
use super::{finish_mask, DetectionError, StageOutput, StreakDetector};

/// Local threshold, elongated-region filter, then a Hough search restricted
/// to edges inside the elongated regions.
///
/// When the Hough stage finds nothing (or fails) but elongated regions were
/// found, the union of those regions is the result and the detected-line
/// count is the number of regions.
#[derive(Clone, Debug, Default)]
pub struct ImprovedDetector {
    config: ImprovedConfig,
}

impl ImprovedDetector {
    pub fn new(config: ImprovedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImprovedConfig {
        &self.config
    }

    /// Union of the connected regions passing the length and aspect filters,
    /// and how many there were.
    fn elongated_regions(&self, smoothed: &Array2<f32>) -> (Array2<bool>, usize) {
        let threshold = gaussian_local_threshold(smoothed, IMPROVED_BLOCK_SIZE, IMPROVED_THRESHOLD_OFFSET);
        let mut binary = Array2::from_elem(smoothed.dim(), false);
        Zip::from(&mut binary)
            .and(smoothed)
            .and(&threshold)
            .for_each(|b, &v, &t| *b = v > t);
        let binary = remove_small_objects(&binary, IMPROVED_MIN_OBJECT_SIZE);

        let mut elongated = Array2::from_elem(smoothed.dim(), false);
        let mut count = 0;
        for region in label_regions(&binary, Connectivity::Eight) {
            let (major, _) = region.axis_lengths();
            let Some(aspect) = region.aspect_ratio() else {
                continue;
            };
            if aspect >= self.config.min_aspect_ratio && major >= self.config.min_streak_length {
                region.paint(&mut elongated);
                count += 1;
            }
        }
        (elongated, count)
    }

    fn line_search(
        smoothed: &Array2<f32>,
        elongated: &Array2<bool>,
    ) -> Result<Vec<HoughLine>, DetectionError> {
        let mut edges = canny(smoothed, IMPROVED_CANNY_SIGMA, IMPROVED_CANNY_LOW, IMPROVED_CANNY_HIGH)?;
        Zip::from(&mut edges).and(elongated).for_each(|e, &m| *e &= m);

        let acc = hough_line(&edges)?;
        let max_votes = acc.max_votes();
        if max_votes == 0 {
            return Ok(Vec::new());
        }
        Ok(hough_line_peaks(
            &acc,
            IMPROVED_PEAK_FRACTION * max_votes as f64,
            Some(IMPROVED_MAX_PEAKS),
        ))
    }

    fn run(&self, image: &Array2<f32>) -> (StageOutput, usize) {
        if image.is_empty() {
            let (rows, cols) = image.dim();
            return (Err(DetectionError::DegenerateImage { rows, cols }), 0);
        }

        let smoothed = gaussian_blur_array(image, IMPROVED_SMOOTH_SIGMA);
        let (elongated, candidates) = self.elongated_regions(&smoothed);
        debug!(candidates, "improved detector elongated regions");
        if candidates == 0 {
            return (Ok((elongated, 0)), 0);
        }

        let lines = match Self::line_search(&smoothed, &elongated) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "line search failed, using region mask");
                Vec::new()
            }
        };

        (Ok(Self::resolve(elongated, candidates, &lines)), candidates)
    }

    /// The rasterized lines when the search found any, otherwise the
    /// elongated regions themselves, counted one line per region.
    fn resolve(elongated: Array2<bool>, candidates: usize, lines: &[HoughLine]) -> (Array2<bool>, usize) {
        if lines.is_empty() {
            return (elongated, candidates);
        }
        let mask = rasterize_lines(elongated.dim(), lines, IMPROVED_LINE_WIDTH);
        (mask, lines.len())
    }
}

impl StreakDetector for ImprovedDetector {
    fn name(&self) -> &'static str {
        "improved"
    }

    fn detect(&self, image: &Array2<f32>) -> Mask {
        let (clean, replaced) = sanitize_image(image);
        let mut meta = DetectorMeta::new(
            DetectionMethod::ImprovedMorphologyHough,
            DetectorParams::Improved {
                threshold_sigma: self.config.threshold_sigma,
                min_streak_length: self.config.min_streak_length,
                min_aspect_ratio: self.config.min_aspect_ratio,
            },
        );
        meta.sanitized_pixels = replaced;

        let (output, candidates) = self.run(&clean);
        meta.candidate_regions = Some(candidates);
        finish_mask(self.name(), image.dim(), meta, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagonal_streak(size: usize) -> Array2<f32> {
        Array2::from_shape_fn((size, size), |(r, c)| {
            let d = (r as f32 - c as f32).abs() / std::f32::consts::SQRT_2;
            if d <= 1.5 && r > 10 && r < size - 10 {
                200.0
            } else {
                10.0
            }
        })
    }

    #[test]
    fn flat_frame_has_no_candidates() {
        let mask = ImprovedDetector::default().detect(&Array2::from_elem((80, 80), 50.0));
        assert_eq!(mask.meta.candidate_regions, Some(0));
        assert_eq!(mask.meta.detected_lines, 0);
        assert_eq!(mask.contaminated_pixels(), 0);
    }

    #[test]
    fn diagonal_streak_is_found() {
        let img = diagonal_streak(120);
        let mask = ImprovedDetector::default().detect(&img);
        assert!(mask.meta.candidate_regions.unwrap_or(0) >= 1);
        assert!(mask.meta.detected_lines >= 1);
        // The streak centre line is covered.
        for k in 20..100 {
            assert_eq!(mask.data[[k, k]], 1, "pixel ({k}, {k})");
        }
    }

    fn two_bars(h: usize, w: usize) -> Array2<bool> {
        Array2::from_shape_fn((h, w), |(r, c)| {
            (r == 10 && (5..45).contains(&c)) || ((30..32).contains(&r) && (8..50).contains(&c))
        })
    }

    #[test]
    fn edgeless_regions_fall_back_to_region_mask() {
        // A flat frame has no gradient, so no edge survives inside the
        // regions and the line search comes back empty.
        let smoothed = Array2::from_elem((40, 60), 25.0f32);
        let elongated = two_bars(40, 60);
        let lines = ImprovedDetector::line_search(&smoothed, &elongated).unwrap();
        assert!(lines.is_empty());

        let (mask, count) = ImprovedDetector::resolve(elongated.clone(), 2, &lines);
        assert_eq!(mask, elongated);
        assert_eq!(count, 2);
    }

    #[test]
    fn found_lines_replace_region_mask() {
        let elongated = two_bars(40, 60);
        let line = HoughLine {
            angle: -std::f64::consts::FRAC_PI_2,
            distance: -20.0,
            votes: 40,
        };
        let (mask, count) = ImprovedDetector::resolve(elongated.clone(), 2, &[line]);
        assert_eq!(count, 1);
        assert!(mask.row(20).iter().all(|&v| v));
        assert!(!mask[[10, 20]]);
        assert_ne!(mask, elongated);
    }

    #[test]
    fn empty_image_is_degraded() {
        let mask = ImprovedDetector::default().detect(&Array2::zeros((0, 5)));
        assert!(mask.meta.is_degraded());
        assert_eq!(mask.shape(), (0, 5));
    }
}
