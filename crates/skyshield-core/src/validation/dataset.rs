use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::detection::StreakDetector;
use crate::error::{Result, SkyShieldError};
use crate::frame::file_name_of;
use crate::io::{has_extension, load_image, read_label_file, RASTER_EXTENSIONS};

use super::ground_truth::parse_ground_truth;
use super::metrics::evaluate_frame;
use super::report::{FrameValidation, ValidationReport};

/// Run `detector` over a labelled dataset laid out as `images/<stem>.<ext>`
/// with optional `labels/<stem>.txt`, and score it against the labels.
///
/// Images are taken in file-name order, at most `max_samples` of them.
/// Frames that fail to load are logged and left out of the report.
pub fn validate_dataset(
    dir: &Path,
    detector: &dyn StreakDetector,
    max_samples: Option<usize>,
) -> Result<ValidationReport> {
    let images_dir = dir.join("images");
    if !images_dir.is_dir() {
        return Err(SkyShieldError::NotFound(images_dir));
    }
    let labels_dir = dir.join("labels");

    let mut images: Vec<PathBuf> = fs::read_dir(&images_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, RASTER_EXTENSIONS))
        .collect();
    images.sort();
    if let Some(max) = max_samples {
        images.truncate(max);
    }
    info!(
        dataset = %dir.display(),
        detector = detector.name(),
        images = images.len(),
        "validating"
    );

    let details: Vec<FrameValidation> = images
        .par_iter()
        .filter_map(|path| match validate_one(path, &labels_dir, detector) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping frame");
                None
            }
        })
        .collect();

    let report = ValidationReport::new(detector.name(), &file_name_of(dir), details);
    info!(
        frames = report.summary.num_frames,
        mean_iou = report.summary.mean_iou,
        global_f1 = report.summary.global_f1,
        "validation finished"
    );
    Ok(report)
}

fn validate_one(
    path: &Path,
    labels_dir: &Path,
    detector: &dyn StreakDetector,
) -> Result<FrameValidation> {
    let frame = load_image(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let label = read_label_file(&labels_dir.join(format!("{stem}.txt")))?;
    let truth = parse_ground_truth(label.as_deref(), frame.data.dim());

    let mask = detector.detect(&frame.data);
    let metrics = evaluate_frame(
        &mask.data,
        &truth.mask,
        truth.num_streaks(),
        mask.meta.detected_lines,
    )?;
    Ok(FrameValidation {
        file: frame.file_name(),
        metrics,
    })
}
