use ndarray::{Array2, Zip};

use crate::stats::median;

/// Median of the finite pixels not covered by `mask` (nonzero = masked).
///
/// Without a mask every finite pixel counts. Returns `None` when no pixel
/// survives; callers drop such frames from aggregation.
pub fn estimate_background(image: &Array2<f32>, mask: Option<&Array2<u8>>) -> Option<f64> {
    let values: Vec<f64> = match mask {
        Some(mask) if mask.dim() == image.dim() => {
            let mut v = Vec::with_capacity(image.len());
            Zip::from(image).and(mask).for_each(|&px, &m| {
                if m == 0 && px.is_finite() {
                    v.push(px as f64);
                }
            });
            v
        }
        Some(mask) => {
            tracing::warn!(
                image = ?image.dim(),
                mask = ?mask.dim(),
                "mask shape differs from image, ignoring mask"
            );
            finite_values(image)
        }
        None => finite_values(image),
    };
    median(&values)
}

fn finite_values(image: &Array2<f32>) -> Vec<f64> {
    image
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_background_is_the_level() {
        let img = Array2::<f32>::from_elem((10, 10), 120.0);
        assert_eq!(estimate_background(&img, None), Some(120.0));
    }

    #[test]
    fn masked_pixels_are_excluded() {
        let mut img = Array2::<f32>::from_elem((4, 4), 5.0);
        let mut mask = Array2::<u8>::zeros((4, 4));
        for c in 0..4 {
            img[[0, c]] = 1000.0;
            img[[1, c]] = 1000.0;
            mask[[0, c]] = 1;
            mask[[1, c]] = 1;
        }
        // Unmasked, the median would sit between 5 and 1000.
        assert_eq!(estimate_background(&img, Some(&mask)), Some(5.0));
    }

    #[test]
    fn fully_masked_image_is_undefined() {
        let img = Array2::<f32>::from_elem((3, 3), 7.0);
        let mask = Array2::<u8>::ones((3, 3));
        assert_eq!(estimate_background(&img, Some(&mask)), None);
    }

    #[test]
    fn non_finite_pixels_are_ignored() {
        let mut img = Array2::<f32>::from_elem((3, 3), 2.0);
        img[[1, 1]] = f32::NAN;
        assert_eq!(estimate_background(&img, None), Some(2.0));
    }
}
