use std::fs;
use std::path::Path;

use image::{ColorType, GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{Result, SkyShieldError};
use crate::frame::Frame;

/// Load a PNG/JPEG/TIFF file as a grayscale frame in the file's native units.
///
/// 8-bit sources keep 0..255 and deeper sources keep 0..65535. Detector
/// thresholds are tuned for these units.
pub fn load_image(path: &Path) -> Result<Frame> {
    if !path.exists() {
        return Err(SkyShieldError::NotFound(path.to_path_buf()));
    }
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return Err(SkyShieldError::NoPixelData(path.to_path_buf()));
    }

    let eight_bit = matches!(
        img.color(),
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
    );
    let values: Vec<f32> = if eight_bit {
        img.to_luma8().into_raw().into_iter().map(f32::from).collect()
    } else {
        img.to_luma16().into_raw().into_iter().map(f32::from).collect()
    };
    let data = Array2::from_shape_vec((h, w), values)
        .map_err(|_| SkyShieldError::InvalidDimensions { width: w, height: h })?;

    Ok(Frame::new(data).with_source(path))
}

/// Save a mask as 8-bit PNG, nonzero pixels white.
pub fn save_mask_png(mask: &Array2<u8>, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in mask.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([if v > 0 { 255 } else { 0 }]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
