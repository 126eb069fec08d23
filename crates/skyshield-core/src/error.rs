use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyShieldError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("No image data found in {}", .0.display())]
    NoPixelData(PathBuf),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Mask shape mismatch: prediction {pred:?}, ground truth {truth:?}")]
    ShapeMismatch {
        pred: (usize, usize),
        truth: (usize, usize),
    },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkyShieldError>;
