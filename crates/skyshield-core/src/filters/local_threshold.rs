use ndarray::Array2;

use super::gaussian_blur::gaussian_blur_array;

/// Spatially varying threshold: Gaussian-weighted local mean minus `offset`.
///
/// The weighting sigma is derived from the neighbourhood size as
/// `(block_size - 1) / 6`, so roughly the whole block lies within 3 sigma.
/// A negative `offset` raises the threshold above the local mean.
pub fn gaussian_local_threshold(data: &Array2<f32>, block_size: usize, offset: f32) -> Array2<f32> {
    let block = block_size.max(3) | 1;
    let sigma = (block - 1) as f32 / 6.0;
    gaussian_blur_array(data, sigma).mapv(|m| m - offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_threshold_is_level_minus_offset() {
        let data = Array2::<f32>::from_elem((60, 60), 100.0);
        let t = gaussian_local_threshold(&data, 51, -5.0);
        assert!(t.iter().all(|v| (v - 105.0).abs() < 1e-3));
    }

    #[test]
    fn threshold_follows_gradient_background() {
        let data = Array2::from_shape_fn((80, 80), |(_, c)| c as f32);
        let t = gaussian_local_threshold(&data, 21, 0.0);
        // Away from the borders the local mean of a linear ramp is the ramp.
        assert!((t[[40, 40]] - 40.0).abs() < 0.5);
        assert!(t[[40, 60]] > t[[40, 20]]);
    }
}
