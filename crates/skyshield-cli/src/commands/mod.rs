pub mod config;
pub mod detect;
pub mod info;
pub mod run;
pub mod sky;
pub mod validate;

use clap::ValueEnum;
use skyshield_core::detection::{AdaptiveConfig, BaselineConfig, DetectorConfig, ImprovedConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DetectorArg {
    Baseline,
    Improved,
    Adaptive,
}

impl DetectorArg {
    /// Default-parameter config for this detector.
    pub fn config(self) -> DetectorConfig {
        match self {
            Self::Baseline => DetectorConfig::Baseline(BaselineConfig::default()),
            Self::Improved => DetectorConfig::Improved(ImprovedConfig::default()),
            Self::Adaptive => DetectorConfig::Adaptive(AdaptiveConfig::default()),
        }
    }
}
