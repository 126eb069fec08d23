use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::detection::StreakDetector;
use crate::error::{Result, SkyShieldError};
use crate::frame::file_name_of;
use crate::io::{has_extension, read_fits, save_mask_png, write_json, write_mask_fits, FITS_EXTENSIONS};
use crate::metrics::{aggregate_night, compute_frame_quality, FrameQuality};
use crate::skyglow::{estimate_background, estimate_odc_from_backgrounds, ObservationContext, OdcOutcome};

use super::config::{OutputConfig, PipelineConfig};
use super::types::{BatchReport, FrameOutcome, NoOpReporter, PipelineStage, ProgressReporter};

/// What the ODC stage needs from one processed frame. Pixel data is dropped
/// as soon as the background is measured.
struct Processed {
    quality: FrameQuality,
    background: Option<f64>,
    context: ObservationContext,
}

#[derive(Serialize)]
struct OdcReport<'a> {
    dataset_id: &'a str,
    #[serde(flatten)]
    odc: &'a OdcOutcome,
}

/// FITS frames of `input_dir` in name order, skipping ground-truth and mask
/// products.
pub fn list_frames(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(SkyShieldError::NotFound(input_dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, FITS_EXTENSIONS))
        .filter(|p| {
            let name = file_name_of(p);
            !name.contains("_truth") && !name.contains("mask")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run detection, quality metrics and ODC estimation over a folder of FITS
/// frames, writing per-frame and per-night products under `output_dir`.
///
/// A frame that fails is recorded in the report and never stops the batch.
pub fn run_on_folder(
    config: &PipelineConfig,
    input_dir: &Path,
    output_dir: &Path,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<BatchReport> {
    let files = list_frames(input_dir)?;
    fs::create_dir_all(output_dir)?;
    let dataset_id = file_name_of(input_dir);
    let detector = config.detection.build();
    info!(
        frames = files.len(),
        detector = detector.name(),
        input = %input_dir.display(),
        "starting folder run"
    );

    reporter.begin_stage(PipelineStage::Detecting, Some(files.len()));
    let counter = AtomicUsize::new(0);
    let results: Vec<(String, Result<Processed>)> = files
        .par_iter()
        .map(|path| {
            let result = process_frame(path, detector.as_ref(), output_dir, &config.output);
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.advance(done);
            (file_name_of(path), result)
        })
        .collect();
    reporter.finish_stage();

    let mut frames = Vec::with_capacity(results.len());
    let mut processed = Vec::new();
    for (file, result) in results {
        match result {
            Ok(p) => {
                frames.push(FrameOutcome::Processed {
                    file,
                    quality: p.quality.clone(),
                });
                processed.push(p);
            }
            Err(e) => {
                warn!(file = %file, error = %e, "frame failed");
                frames.push(FrameOutcome::Failed {
                    file,
                    reason: e.to_string(),
                });
            }
        }
    }

    reporter.begin_stage(PipelineStage::Aggregating, None);
    let qualities: Vec<FrameQuality> = processed.iter().map(|p| p.quality.clone()).collect();
    let night = aggregate_night(&qualities, &dataset_id);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::EstimatingOdc, None);
    let backgrounds: Vec<Option<f64>> = processed.iter().map(|p| p.background).collect();
    let context = processed.iter().map(|p| &p.context).find(|c| c.has_metadata);
    let odc = estimate_odc_from_backgrounds(&backgrounds, context, &config.odc, &config.sky_model);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Writing, Some(2));
    write_json(&output_dir.join("night_summary.json"), &night)?;
    reporter.advance(1);
    write_json(
        &output_dir.join("odc_report.json"),
        &OdcReport {
            dataset_id: &dataset_id,
            odc: &odc,
        },
    )?;
    reporter.advance(2);
    reporter.finish_stage();

    let report = BatchReport {
        output_dir: output_dir.to_path_buf(),
        frames,
        night,
        odc,
    };
    info!(
        processed = report.processed(),
        failed = report.frames.len() - report.processed(),
        "folder run complete"
    );
    Ok(report)
}

/// [`run_on_folder`] without progress reporting.
pub fn run_on_folder_quiet(
    config: &PipelineConfig,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<BatchReport> {
    run_on_folder(config, input_dir, output_dir, Arc::new(NoOpReporter))
}

fn process_frame(
    path: &Path,
    detector: &dyn StreakDetector,
    output_dir: &Path,
    output: &OutputConfig,
) -> Result<Processed> {
    let frame = read_fits(path)?;
    let mask = detector.detect(&frame.data);
    let quality = compute_frame_quality(&frame, &mask);

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if output.write_masks {
        let mask_path = output_dir.join("masks").join(format!("{stem}_mask.fits"));
        write_mask_fits(&mask_path, &mask.data, Some(&frame.header))?;
    }
    if output.mask_png {
        save_mask_png(&mask.data, &output_dir.join("masks").join(format!("{stem}_mask.png")))?;
    }
    if output.write_quality {
        write_json(
            &output_dir.join("quality").join(format!("{stem}_quality.json")),
            &quality,
        )?;
    }

    Ok(Processed {
        background: estimate_background(&frame.data, Some(&mask.data)),
        context: ObservationContext::from_header(&frame.header),
        quality,
    })
}
