//! Small order statistics shared by the detectors, the background estimator
//! and the report aggregators.
//!
//! Percentiles use linear interpolation between closest ranks, so
//! `percentile(v, 50.0)` equals the conventional median.

use ndarray::Array2;

/// Mean and population standard deviation of pixel values.
pub fn mean_stddev(data: &Array2<f32>) -> (f64, f64) {
    let n = data.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let sum: f64 = data.iter().map(|&v| v as f64).sum();
    let mean = sum / n;
    let var: f64 = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Mean and population standard deviation of a slice.
pub fn mean_stddev_slice(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Percentile `q` (0..=100) of an already sorted slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile `q` (0..=100) of an unsorted slice. `None` when empty.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, q)
}

/// Median of an unsorted slice. `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Percentile `q` of all finite pixels of an image.
pub fn image_percentile(data: &Array2<f32>, q: f64) -> Option<f64> {
    let values: Vec<f64> = data
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect();
    percentile(&values, q)
}

/// Replace non-finite pixels with the median of the finite ones.
///
/// Images with no finite pixel become all-zero. Returns the sanitized copy and
/// the number of pixels that were replaced.
pub fn sanitize_image(data: &Array2<f32>) -> (Array2<f32>, usize) {
    let bad = data.iter().filter(|v| !v.is_finite()).count();
    if bad == 0 {
        return (data.clone(), 0);
    }
    let fill = image_percentile(data, 50.0).unwrap_or(0.0) as f32;
    let cleaned = data.mapv(|v| if v.is_finite() { v } else { fill });
    (cleaned, bad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 100.0), Some(4.0));
        assert_eq!(median(&v), Some(2.5));
        let p5 = percentile(&v, 5.0).unwrap();
        assert!((p5 - 1.15).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_have_no_percentile() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(mean_stddev_slice(&[]), (0.0, 0.0));
    }

    #[test]
    fn sanitize_replaces_nan_with_median() {
        let mut data = Array2::<f32>::from_elem((3, 3), 4.0);
        data[[1, 1]] = f32::NAN;
        data[[0, 2]] = f32::INFINITY;
        let (clean, replaced) = sanitize_image(&data);
        assert_eq!(replaced, 2);
        assert!(clean.iter().all(|v| *v == 4.0));
    }

    #[test]
    fn sanitize_all_nan_gives_zero() {
        let data = Array2::<f32>::from_elem((2, 2), f32::NAN);
        let (clean, replaced) = sanitize_image(&data);
        assert_eq!(replaced, 4);
        assert!(clean.iter().all(|v| *v == 0.0));
    }
}
