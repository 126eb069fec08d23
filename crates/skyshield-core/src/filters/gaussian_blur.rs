use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply Gaussian blur to a raw array using separable 1D convolution.
///
/// Borders replicate the nearest edge pixel, so a flat image stays flat.
/// A non-positive sigma returns a copy of the input.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || data.is_empty() {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_axis(data, &kernel, Axis::Rows);
    convolve_axis(&row_pass, &kernel, Axis::Cols)
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

#[derive(Clone, Copy)]
enum Axis {
    /// Convolve along each row (horizontal pass).
    Rows,
    /// Convolve along each column (vertical pass).
    Cols,
}

fn convolve_pixel(data: &Array2<f32>, kernel: &[f32], row: usize, col: usize, axis: Axis) -> f32 {
    let (h, w) = data.dim();
    let radius = kernel.len() / 2;
    let mut sum = 0.0f32;
    for (ki, &kv) in kernel.iter().enumerate() {
        let offset = ki as isize - radius as isize;
        let v = match axis {
            Axis::Rows => {
                let src_col = (col as isize + offset).clamp(0, w as isize - 1) as usize;
                data[[row, src_col]]
            }
            Axis::Cols => {
                let src_row = (row as isize + offset).clamp(0, h as isize - 1) as usize;
                data[[src_row, col]]
            }
        };
        sum += v * kv;
    }
    sum
}

fn convolve_axis(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                (0..w)
                    .map(|col| convolve_pixel(data, kernel, row, col, axis))
                    .collect()
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| {
            convolve_pixel(data, kernel, row, col, axis)
        })
    }
}
