pub mod fits;
pub mod fits_writer;
pub mod image_io;
pub mod labels;
pub mod report;

pub use fits::read_fits;
pub use fits_writer::{write_fits, write_mask_fits};
pub use image_io::{load_image, save_mask_png};
pub use labels::read_label_file;
pub use report::write_json;

use std::path::Path;

use crate::error::Result;
use crate::frame::Frame;

/// Extensions recognised as FITS.
pub const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

/// Extensions recognised as raster images.
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Load a frame, choosing the reader from the file extension.
pub fn load_frame(path: &Path) -> Result<Frame> {
    if has_extension(path, FITS_EXTENSIONS) {
        read_fits(path)
    } else {
        load_image(path)
    }
}
