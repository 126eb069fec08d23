use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{
    BASELINE_PERCENTILE, DEFAULT_BOOTSTRAP_SAMPLES, DEFAULT_BOOTSTRAP_SEED,
    MAGNITUDE_MAP_BRIGHT, MAGNITUDE_MAP_FAINT, MAGNITUDE_MAP_HIGH_PERCENTILE,
    MAGNITUDE_MAP_LOW_PERCENTILE,
};
use crate::frame::Frame;
use crate::mask::Mask;
use crate::stats::{median, percentile, percentile_sorted};

use super::background::estimate_background;
use super::context::ObservationContext;
use super::sky_model::{estimate_odc_from_observed, natural_sky_for_context, OdcResidual, SkyModelConfig};

/// Settings of the ODC estimator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdcConfig {
    /// Bootstrap resamples for the confidence interval; 0 disables it.
    #[serde(default = "default_bootstrap_samples")]
    pub bootstrap_samples: usize,
    /// Seed of the bootstrap generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Try the physical sky model when a frame carries observation metadata.
    #[serde(default = "default_true")]
    pub use_physical_model: bool,
    /// Magnitude given to the 95th-percentile (brightest) background.
    #[serde(default = "default_magnitude_bright")]
    pub magnitude_bright: f64,
    /// Magnitude given to the 5th-percentile (darkest) background.
    #[serde(default = "default_magnitude_faint")]
    pub magnitude_faint: f64,
}

fn default_bootstrap_samples() -> usize {
    DEFAULT_BOOTSTRAP_SAMPLES
}
fn default_seed() -> u64 {
    DEFAULT_BOOTSTRAP_SEED
}
fn default_true() -> bool {
    true
}
fn default_magnitude_bright() -> f64 {
    MAGNITUDE_MAP_BRIGHT
}
fn default_magnitude_faint() -> f64 {
    MAGNITUDE_MAP_FAINT
}

impl Default for OdcConfig {
    fn default() -> Self {
        Self {
            bootstrap_samples: DEFAULT_BOOTSTRAP_SAMPLES,
            seed: DEFAULT_BOOTSTRAP_SEED,
            use_physical_model: true,
            magnitude_bright: MAGNITUDE_MAP_BRIGHT,
            magnitude_faint: MAGNITUDE_MAP_FAINT,
        }
    }
}

/// How the reported excess was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdcMethod {
    /// No frame carried observation metadata (or the model was disabled).
    PercentileBaseline,
    /// The physical model ran; the percentile excess is still reported.
    PhysicalWithPercentileFallback,
    /// The physical model was attempted and failed.
    PercentileAfterModelFailure,
}

impl std::fmt::Display for OdcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PercentileBaseline => write!(f, "percentile baseline"),
            Self::PhysicalWithPercentileFallback => {
                write!(f, "physical model with percentile fallback")
            }
            Self::PercentileAfterModelFailure => {
                write!(f, "percentile baseline (physical model failed)")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdcResult {
    /// Percentile-baseline flux excess, percent.
    pub odc_percent: f64,
    /// Natural minus observed magnitude, when the physical model ran.
    pub odc_magnitude_diff: Option<f64>,
    /// 95% bootstrap interval of `odc_percent`.
    pub odc_ci95: [f64; 2],
    pub baseline_level: f64,
    pub median_level: f64,
    /// Frames with a defined background.
    pub n_frames: usize,
    /// Frames dropped because nothing was left unmasked.
    pub n_excluded: usize,
    pub method: OdcMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<OdcResidual>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_error: Option<String>,
}

/// ODC estimate, or the reason there is none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OdcOutcome {
    Estimated(OdcResult),
    /// Every frame was empty or fully masked.
    NoValidData { frames_seen: usize },
}

impl OdcOutcome {
    pub fn result(&self) -> Option<&OdcResult> {
        match self {
            Self::Estimated(r) => Some(r),
            Self::NoValidData { .. } => None,
        }
    }
}

/// Estimate the ODC of a batch of frames and their streak masks.
///
/// Frames and masks are paired by position. The first frame whose header
/// carries observation metadata drives the physical model.
pub fn estimate_odc(
    frames: &[Frame],
    masks: &[Mask],
    config: &OdcConfig,
    sky: &SkyModelConfig,
) -> OdcOutcome {
    if frames.len() != masks.len() {
        warn!(
            frames = frames.len(),
            masks = masks.len(),
            "frame and mask counts differ, extra items ignored"
        );
    }

    let backgrounds: Vec<Option<f64>> = frames
        .par_iter()
        .zip(masks.par_iter())
        .map(|(frame, mask)| estimate_background(&frame.data, Some(&mask.data)))
        .collect();

    let context = frames
        .iter()
        .map(|f| ObservationContext::from_header(&f.header))
        .find(|ctx| ctx.has_metadata);

    estimate_odc_from_backgrounds(&backgrounds, context.as_ref(), config, sky)
}

/// Estimate from per-frame background levels already measured (`None` for
/// frames without a defined background).
pub fn estimate_odc_from_backgrounds(
    backgrounds: &[Option<f64>],
    context: Option<&ObservationContext>,
    config: &OdcConfig,
    sky: &SkyModelConfig,
) -> OdcOutcome {
    let valid: Vec<f64> = backgrounds.iter().flatten().copied().collect();
    if valid.is_empty() {
        warn!(frames = backgrounds.len(), "no valid background data");
        return OdcOutcome::NoValidData {
            frames_seen: backgrounds.len(),
        };
    }

    let (baseline, current, odc_percent) = percentile_excess(&valid);
    let odc_ci95 = bootstrap_ci(&valid, config.bootstrap_samples, config.seed);

    let mut result = OdcResult {
        odc_percent,
        odc_magnitude_diff: None,
        odc_ci95,
        baseline_level: baseline,
        median_level: current,
        n_frames: valid.len(),
        n_excluded: backgrounds.len() - valid.len(),
        method: OdcMethod::PercentileBaseline,
        physical: None,
        model_error: None,
    };

    if let Some(ctx) = context.filter(|_| config.use_physical_model) {
        match natural_sky_for_context(ctx, sky) {
            Ok(natural) => {
                let observed = background_to_magnitude(current, &valid, config);
                let residual = estimate_odc_from_observed(observed, &natural);
                debug!(
                    observed,
                    natural = natural.total_sky_brightness,
                    "physical sky model residual"
                );
                result.odc_magnitude_diff = Some(residual.odc_magnitude_diff);
                result.physical = Some(residual);
                result.method = OdcMethod::PhysicalWithPercentileFallback;
            }
            Err(e) => {
                warn!(error = %e, "physical sky model failed, using percentile baseline");
                result.model_error = Some(e.to_string());
                result.method = OdcMethod::PercentileAfterModelFailure;
            }
        }
    }

    info!(
        odc_percent = result.odc_percent,
        frames = result.n_frames,
        method = %result.method,
        "ODC estimated"
    );
    OdcOutcome::Estimated(result)
}

/// Baseline (5th percentile), current (median) and the percent excess of
/// current over baseline. Non-positive baselines give 0 percent.
pub fn percentile_excess(values: &[f64]) -> (f64, f64, f64) {
    let baseline = percentile(values, BASELINE_PERCENTILE).unwrap_or(0.0);
    let current = median(values).unwrap_or(0.0);
    let excess = (current - baseline).max(0.0);
    let percent = if baseline > 0.0 {
        excess / baseline * 100.0
    } else {
        0.0
    };
    (baseline, current, percent)
}

/// [2.5, 97.5] percentile band of the resampled percent excess.
///
/// Resample `i` draws from its own ChaCha stream of `seed`, so the band does
/// not depend on thread scheduling.
pub fn bootstrap_ci(values: &[f64], samples: usize, seed: u64) -> [f64; 2] {
    if samples == 0 || values.is_empty() {
        return [0.0, 0.0];
    }
    let n = values.len();
    let mut estimates: Vec<f64> = (0..samples)
        .into_par_iter()
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(i as u64);
            let sample: Vec<f64> = (0..n).map(|_| values[rng.gen_range(0..n)]).collect();
            percentile_excess(&sample).2
        })
        .collect();
    estimates.sort_unstable_by(|a, b| a.total_cmp(b));
    [
        percentile_sorted(&estimates, 2.5).unwrap_or(0.0),
        percentile_sorted(&estimates, 97.5).unwrap_or(0.0),
    ]
}

/// Map a background level onto the configured magnitude range by linear
/// interpolation between the 5th (faint end) and 95th (bright end)
/// percentiles of the batch. A batch with no spread maps to the faint end.
pub fn background_to_magnitude(level: f64, backgrounds: &[f64], config: &OdcConfig) -> f64 {
    let lo = percentile(backgrounds, MAGNITUDE_MAP_LOW_PERCENTILE).unwrap_or(level);
    let hi = percentile(backgrounds, MAGNITUDE_MAP_HIGH_PERCENTILE).unwrap_or(level);
    if hi - lo <= 0.0 {
        return config.magnitude_faint;
    }
    let t = ((level - lo) / (hi - lo)).clamp(0.0, 1.0);
    config.magnitude_faint - t * (config.magnitude_faint - config.magnitude_bright)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn excess_of_flat_batch_is_zero() {
        let (b, c, p) = percentile_excess(&[100.0, 100.0, 100.0]);
        assert_eq!((b, c, p), (100.0, 100.0, 0.0));
    }

    #[test]
    fn excess_over_non_positive_baseline_is_zero() {
        let (_, _, p) = percentile_excess(&[-5.0, 0.0, 10.0, 20.0]);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn excess_is_relative_to_fifth_percentile() {
        let values: Vec<f64> = (0..=100).map(|i| 100.0 + i as f64).collect();
        let (b, c, p) = percentile_excess(&values);
        assert_abs_diff_eq!(b, 105.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c, 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p, 45.0 / 105.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn disabled_bootstrap_is_degenerate() {
        assert_eq!(bootstrap_ci(&[1.0, 2.0, 3.0], 0, 7), [0.0, 0.0]);
    }

    #[test]
    fn bootstrap_is_reproducible_and_ordered() {
        let values: Vec<f64> = (0..40).map(|i| 50.0 + (i * 7 % 13) as f64).collect();
        let a = bootstrap_ci(&values, 200, 42);
        let b = bootstrap_ci(&values, 200, 42);
        assert_eq!(a, b);
        assert!(a[0] <= a[1]);
    }

    #[test]
    fn magnitude_map_spans_configured_range() {
        let cfg = OdcConfig::default();
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert_abs_diff_eq!(background_to_magnitude(5.0, &values, &cfg), 22.0, epsilon = 1e-9);
        assert_abs_diff_eq!(background_to_magnitude(95.0, &values, &cfg), 18.0, epsilon = 1e-9);
        assert_abs_diff_eq!(background_to_magnitude(50.0, &values, &cfg), 20.0, epsilon = 1e-9);
        assert_eq!(background_to_magnitude(3.0, &[3.0, 3.0], &cfg), 22.0);
    }
}
