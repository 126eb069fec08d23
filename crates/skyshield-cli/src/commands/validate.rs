use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;
use skyshield_core::io::write_json;
use skyshield_core::validation::validate_dataset;

use crate::summary::print_validation_summary;

use super::DetectorArg;

#[derive(Args)]
pub struct ValidateArgs {
    /// Dataset folder containing images/ and labels/
    pub dataset: PathBuf,

    /// Detector to evaluate
    #[arg(long, value_enum, default_value = "adaptive")]
    pub detector: DetectorArg,

    /// Evaluate at most this many images
    #[arg(long)]
    pub max_samples: Option<usize>,

    /// Write the full report here as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let detector = args.detector.config().build();

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Validating {} detector", detector.name()));
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let report = validate_dataset(&args.dataset, detector.as_ref(), args.max_samples)
        .with_context(|| format!("Validation failed on {}", args.dataset.display()))?;
    pb.finish_and_clear();

    print_validation_summary(&report);

    if let Some(ref path) = args.output {
        write_json(path, &report)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nReport saved to {}", path.display());
    }
    Ok(())
}
