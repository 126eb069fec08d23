use std::collections::VecDeque;

use ndarray::Array2;

use crate::filters::gaussian_blur::gaussian_blur_array;

use super::DetectionError;

/// Sobel gradients `(gx, gy)` of an image, `gx` along columns and `gy` along
/// rows. The 1-pixel border is zero.
pub fn sobel_gradients(data: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = data.dim();
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));

    if h < 3 || w < 3 {
        return (gx, gy);
    }

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let x = -data[[row - 1, col - 1]] as f64 + data[[row - 1, col + 1]] as f64
                - 2.0 * data[[row, col - 1]] as f64
                + 2.0 * data[[row, col + 1]] as f64
                - data[[row + 1, col - 1]] as f64
                + data[[row + 1, col + 1]] as f64;

            let y = -data[[row - 1, col - 1]] as f64
                - 2.0 * data[[row - 1, col]] as f64
                - data[[row - 1, col + 1]] as f64
                + data[[row + 1, col - 1]] as f64
                + 2.0 * data[[row + 1, col]] as f64
                + data[[row + 1, col + 1]] as f64;

            gx[[row, col]] = x as f32;
            gy[[row, col]] = y as f32;
        }
    }

    (gx, gy)
}

/// Canny edge detector.
///
/// Pipeline: Gaussian blur -> Sobel gradients -> non-maximum suppression
/// along the quantized gradient direction -> hysteresis (8-connected growth
/// from pixels >= `high` through pixels >= `low`). Thresholds apply to the
/// Sobel gradient magnitude. Border pixels are never edges.
pub fn canny(
    data: &Array2<f32>,
    sigma: f32,
    low: f32,
    high: f32,
) -> Result<Array2<bool>, DetectionError> {
    if !low.is_finite() || !high.is_finite() || low > high {
        return Err(DetectionError::InvalidThresholds { low, high });
    }

    let (h, w) = data.dim();
    let mut edges = Array2::from_elem((h, w), false);
    if h < 3 || w < 3 {
        return Ok(edges);
    }

    let smoothed = gaussian_blur_array(data, sigma);
    let (gx, gy) = sobel_gradients(&smoothed);
    let magnitude = Array2::from_shape_fn((h, w), |(r, c)| gx[[r, c]].hypot(gy[[r, c]]));
    let thin = non_maximum_suppression(&magnitude, &gx, &gy);

    let mut queue = VecDeque::new();
    for row in 1..h - 1 {
        for col in 1..w - 1 {
            if thin[[row, col]] && magnitude[[row, col]] >= high {
                edges[[row, col]] = true;
                queue.push_back((row, col));
            }
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        for dr in -1..=1_isize {
            for dc in -1..=1_isize {
                let nr = row as isize + dr;
                let nc = col as isize + dc;
                if nr < 1 || nc < 1 || nr >= h as isize - 1 || nc >= w as isize - 1 {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if !edges[[nr, nc]] && thin[[nr, nc]] && magnitude[[nr, nc]] >= low {
                    edges[[nr, nc]] = true;
                    queue.push_back((nr, nc));
                }
            }
        }
    }

    Ok(edges)
}

/// Keep pixels whose magnitude is a local maximum across the edge.
fn non_maximum_suppression(
    magnitude: &Array2<f32>,
    gx: &Array2<f32>,
    gy: &Array2<f32>,
) -> Array2<bool> {
    let (h, w) = magnitude.dim();
    let mut keep = Array2::from_elem((h, w), false);

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let m = magnitude[[row, col]];
            if m <= 0.0 {
                continue;
            }
            let angle = gy[[row, col]].atan2(gx[[row, col]]).to_degrees().rem_euclid(180.0);
            // Neighbour offsets (drow, dcol) along the gradient direction.
            let (dr, dc): (isize, isize) = if !(22.5..157.5).contains(&angle) {
                (0, 1)
            } else if angle < 67.5 {
                (1, 1)
            } else if angle < 112.5 {
                (1, 0)
            } else {
                (1, -1)
            };
            let a = magnitude[[(row as isize + dr) as usize, (col as isize + dc) as usize]];
            let b = magnitude[[(row as isize - dr) as usize, (col as isize - dc) as usize]];
            keep[[row, col]] = m >= a && m >= b;
        }
    }

    keep
}
