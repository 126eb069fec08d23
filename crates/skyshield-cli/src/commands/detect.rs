use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use skyshield_core::io::{load_frame, save_mask_png, write_json, write_mask_fits};
use skyshield_core::metrics::compute_frame_quality;

use crate::summary::print_frame_quality;

use super::DetectorArg;

#[derive(Args)]
pub struct DetectArgs {
    /// Input frame (FITS, PNG, JPEG or TIFF)
    pub file: PathBuf,

    /// Detector to use
    #[arg(long, value_enum, default_value = "adaptive")]
    pub detector: DetectorArg,

    /// Write the mask here (.fits or .png)
    #[arg(short, long)]
    pub mask: Option<PathBuf>,

    /// Write the frame quality record here as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

pub fn run(args: &DetectArgs) -> Result<()> {
    let frame = load_frame(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let detector = args.detector.config().build();
    let mask = detector.detect(&frame.data);
    let quality = compute_frame_quality(&frame, &mask);

    print_frame_quality(&quality);

    if let Some(ref path) = args.mask {
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        let written = if is_png {
            save_mask_png(&mask.data, path)
        } else {
            write_mask_fits(path, &mask.data, Some(&frame.header))
        };
        written.with_context(|| format!("Failed to write mask {}", path.display()))?;
        println!("\nMask saved to {}", path.display());
    }
    if let Some(ref path) = args.json {
        write_json(path, &quality)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Quality saved to {}", path.display());
    }

    Ok(())
}
