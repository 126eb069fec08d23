#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;
use skyshield_core::frame::{FrameHeader, HeaderValue};
use skyshield_core::io::write_fits;
use skyshield_core::mask::{DetectionMethod, DetectorMeta, DetectorParams, Mask};

/// Constant-valued image.
pub fn flat_image(h: usize, w: usize, value: f32) -> Array2<f32> {
    Array2::from_elem((h, w), value)
}

/// Add `amplitude` to rows `r0..=r1` of every column (a horizontal streak).
pub fn add_horizontal_streak(img: &mut Array2<f32>, r0: usize, r1: usize, amplitude: f32) {
    for r in r0..=r1 {
        for v in img.row_mut(r).iter_mut() {
            *v += amplitude;
        }
    }
}

/// Add `amplitude` to every pixel within `half_width` of the segment
/// `(r0, c0)`-`(r1, c1)`.
pub fn add_segment(
    img: &mut Array2<f32>,
    (r0, c0): (f64, f64),
    (r1, c1): (f64, f64),
    half_width: f64,
    amplitude: f32,
) {
    let (dr, dc) = (r1 - r0, c1 - c0);
    let len2 = dr * dr + dc * dc;
    for ((r, c), v) in img.indexed_iter_mut() {
        let (pr, pc) = (r as f64 - r0, c as f64 - c0);
        let t = ((pr * dr + pc * dc) / len2).clamp(0.0, 1.0);
        let (er, ec) = (pr - t * dr, pc - t * dc);
        if (er * er + ec * ec).sqrt() <= half_width {
            *v += amplitude;
        }
    }
}

/// Deterministic pseudo-noise in `[-amplitude, amplitude]` (LCG), so tests
/// need no RNG dependency.
pub fn add_noise(img: &mut Array2<f32>, amplitude: f32, seed: u64) {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    for v in img.iter_mut() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let u = (state >> 33) as f32 / (1u64 << 31) as f32;
        *v += (2.0 * u - 1.0) * amplitude;
    }
}

/// Mask with the given pixel block set, for estimator tests.
pub fn mask_from(data: Array2<u8>, detected_lines: usize) -> Mask {
    let mut meta = DetectorMeta::new(
        DetectionMethod::AdaptivePercentile,
        DetectorParams::Adaptive {
            percentile_threshold: 98.0,
            min_streak_length: 30.0,
            min_aspect_ratio: 3.0,
        },
    );
    meta.detected_lines = detected_lines;
    Mask { data, meta }
}

/// Header with an observation time and site, as a telescope would write it.
pub fn observing_header(date_obs: &str) -> FrameHeader {
    let mut h = FrameHeader::new();
    h.set("DATE-OBS", HeaderValue::Str(date_obs.to_string()));
    h.set("SITELAT", HeaderValue::Str("-30:14:16".to_string()));
    h.set("SITELONG", HeaderValue::Float(-70.74));
    h.set("SITEELEV", HeaderValue::Float(2400.0));
    h.set("ALTITUDE", HeaderValue::Float(90.0));
    h.set("EXPTIME", HeaderValue::Float(30.0));
    h.set("FILTER", HeaderValue::Str("r".to_string()));
    h
}

/// Write a FITS frame into `dir` and return its path.
pub fn write_frame(dir: &Path, name: &str, data: &Array2<f32>, header: Option<&FrameHeader>) -> PathBuf {
    let path = dir.join(name);
    write_fits(&path, data, header).expect("write test FITS");
    path
}
