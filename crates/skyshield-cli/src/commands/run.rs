use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use skyshield_core::pipeline::{run_on_folder, PipelineConfig, PipelineStage, ProgressReporter};

use crate::summary::{print_batch_report, print_run_summary};

use super::DetectorArg;

#[derive(Args)]
pub struct RunArgs {
    /// Folder of FITS frames
    pub input: PathBuf,

    /// Output folder
    #[arg(short, long, default_value = "skyshield_out")]
    pub output: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Detector to use, overriding the config file
    #[arg(long, value_enum)]
    pub detector: Option<DetectorArg>,

    /// Bootstrap resamples for the ODC interval
    #[arg(long)]
    pub bootstrap: Option<usize>,

    /// Bootstrap seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also write PNG previews of the masks
    #[arg(long)]
    pub mask_png: bool,
}

struct BarReporter {
    pb: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.pb.set_length(total_items.unwrap_or(1) as u64);
        self.pb.set_position(0);
        self.pb.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.pb.length() {
            self.pb.set_position(len);
        }
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(detector) = args.detector {
        config.detection = detector.config();
    }
    if let Some(samples) = args.bootstrap {
        config.odc.bootstrap_samples = samples;
    }
    if let Some(seed) = args.seed {
        config.odc.seed = seed;
    }
    config.output.mask_png |= args.mask_png;

    print_run_summary(&config, &args.input, &args.output);

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:26} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = Arc::new(BarReporter { pb: pb.clone() });

    let report = run_on_folder(&config, &args.input, &args.output, reporter)
        .with_context(|| format!("Pipeline failed on {}", args.input.display()))?;
    pb.finish_with_message("Done");

    print_batch_report(&report);
    Ok(())
}
