/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

// ---------------------------------------------------------------------------
// Baseline detector
// ---------------------------------------------------------------------------

/// Sigma multiplier for the global bright-pixel threshold.
pub const DEFAULT_BASELINE_THRESHOLD_SIGMA: f32 = 5.0;

/// Half-width (pixels) used when rasterizing accepted Hough lines.
pub const DEFAULT_BASELINE_LINE_WIDTH: f32 = 3.0;

/// Gaussian sigma of the Canny smoothing stage.
pub const BASELINE_CANNY_SIGMA: f32 = 2.0;

/// Canny low threshold = mean + this * std of the raw image.
pub const BASELINE_CANNY_LOW_SIGMA: f64 = 2.0;

/// Canny high threshold = mean + this * std of the raw image.
pub const BASELINE_CANNY_HIGH_SIGMA: f64 = 5.0;

/// Hough peaks must reach this fraction of the accumulator maximum.
pub const BASELINE_PEAK_FRACTION: f64 = 0.3;

/// Widest edge-to-edge separation (pixels) still read as the two flanks of a
/// single streak.
pub const BASELINE_MAX_STREAK_WIDTH: f64 = 20.0;

// ---------------------------------------------------------------------------
// Improved detector
// ---------------------------------------------------------------------------

pub const DEFAULT_IMPROVED_THRESHOLD_SIGMA: f32 = 3.0;

/// Pre-threshold smoothing sigma.
pub const IMPROVED_SMOOTH_SIGMA: f32 = 1.0;

/// Neighbourhood size of the Gaussian local threshold.
pub const IMPROVED_BLOCK_SIZE: usize = 51;

/// Offset subtracted from the local threshold (negative raises it).
pub const IMPROVED_THRESHOLD_OFFSET: f32 = -5.0;

/// Components smaller than this are discarded before region analysis.
pub const IMPROVED_MIN_OBJECT_SIZE: usize = 20;

pub const IMPROVED_CANNY_SIGMA: f32 = 1.5;
pub const IMPROVED_CANNY_LOW: f32 = 0.1;
pub const IMPROVED_CANNY_HIGH: f32 = 0.2;

pub const IMPROVED_PEAK_FRACTION: f64 = 0.15;
pub const IMPROVED_MAX_PEAKS: usize = 10;
pub const IMPROVED_LINE_WIDTH: f32 = 5.0;

// ---------------------------------------------------------------------------
// Adaptive detector
// ---------------------------------------------------------------------------

pub const DEFAULT_ADAPTIVE_PERCENTILE: f64 = 98.0;
pub const ADAPTIVE_SMOOTH_SIGMA: f32 = 1.5;
pub const ADAPTIVE_MIN_OBJECT_SIZE: usize = 15;

// ---------------------------------------------------------------------------
// Shared region filters
// ---------------------------------------------------------------------------

pub const DEFAULT_MIN_STREAK_LENGTH: f64 = 30.0;
pub const DEFAULT_MIN_ASPECT_RATIO: f64 = 3.0;

// ---------------------------------------------------------------------------
// Hough transform
// ---------------------------------------------------------------------------

/// Number of angle bins over [-pi/2, pi/2).
pub const HOUGH_ANGLE_BINS: usize = 180;

/// Peak suppression neighbourhood along the distance axis (bins).
pub const HOUGH_MIN_DISTANCE: usize = 9;

/// Peak suppression neighbourhood along the angle axis (bins).
pub const HOUGH_MIN_ANGLE: usize = 10;

// ---------------------------------------------------------------------------
// Frame / night metrics
// ---------------------------------------------------------------------------

/// Severity = min(area_fraction * this, 1.0).
pub const SEVERITY_AREA_SCALE: f64 = 10.0;

/// Area fraction above which a frame is flagged HIGH_CONTAMINATION.
pub const HIGH_CONTAMINATION_FRACTION: f64 = 0.05;

/// Upper edges of the severity histogram buckets. The last bucket is closed.
pub const SEVERITY_BUCKET_EDGES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

// ---------------------------------------------------------------------------
// ODC estimator
// ---------------------------------------------------------------------------

pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 100;
pub const DEFAULT_BOOTSTRAP_SEED: u64 = 42;

/// Percentile of frame backgrounds taken as the natural-sky baseline.
pub const BASELINE_PERCENTILE: f64 = 5.0;

/// Percentiles spanning the background-to-magnitude interpolation.
pub const MAGNITUDE_MAP_LOW_PERCENTILE: f64 = 5.0;
pub const MAGNITUDE_MAP_HIGH_PERCENTILE: f64 = 95.0;

/// Magnitude assigned to the brightest (p95) background level.
pub const MAGNITUDE_MAP_BRIGHT: f64 = 18.0;

/// Magnitude assigned to the darkest (p5) background level.
pub const MAGNITUDE_MAP_FAINT: f64 = 22.0;

/// Flux excess (percent) above which an ODC residual is flagged significant.
pub const SIGNIFICANT_EXCESS_PERCENT: f64 = 5.0;

// ---------------------------------------------------------------------------
// Natural sky model
// ---------------------------------------------------------------------------

pub const SKY_MODEL_VERSION: &str = "v1.0_krisciunas_schaefer";

/// Dark-sky zenith brightness (mag/arcsec^2).
pub const DARK_SKY_MAG: f64 = 22.0;

/// Moon altitude below which the lunar term is the dark-sky value.
pub const MOON_HORIZON_CUTOFF_DEG: f64 = -10.0;

/// Zero point converting lunar scattered flux into mag/arcsec^2.
pub const LUNAR_CALIBRATION_OFFSET: f64 = 21.58;

pub const DEFAULT_EXTINCTION: f64 = 0.25;

/// Atmospheric scale height used for the pressure correction.
pub const ATMOSPHERE_SCALE_HEIGHT_M: f64 = 8000.0;

/// Beyond this zenith distance the secant airmass is replaced by the cap.
pub const AIRMASS_SECANT_LIMIT_DEG: f64 = 70.0;
pub const AIRMASS_CAP: f64 = 5.0;

/// Twilight brightness steps (mag/arcsec^2) keyed by solar altitude.
pub const TWILIGHT_CIVIL_MAG: f64 = 10.0;
pub const TWILIGHT_NAUTICAL_MAG: f64 = 16.0;
pub const TWILIGHT_ASTRONOMICAL_MAG: f64 = 19.0;
