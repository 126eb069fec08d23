use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::DetectorConfig;
use crate::error::{Result, SkyShieldError};
use crate::skyglow::{OdcConfig, SkyModelConfig};

/// Everything a folder run needs. Every section may be omitted in TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detection: DetectorConfig,
    #[serde(default)]
    pub odc: OdcConfig,
    #[serde(default)]
    pub sky_model: SkyModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write `masks/<stem>_mask.fits` per frame.
    #[serde(default = "default_true")]
    pub write_masks: bool,
    /// Write `quality/<stem>_quality.json` per frame.
    #[serde(default = "default_true")]
    pub write_quality: bool,
    /// Also write `masks/<stem>_mask.png` previews.
    #[serde(default)]
    pub mask_png: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_masks: true,
            write_quality: true,
            mask_png: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SkyShieldError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SkyShieldError::NotFound(path.to_path_buf()));
        }
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SkyShieldError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn default_survives_toml() {
        let config = PipelineConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = PipelineConfig::from_toml_str(
            "[odc]\nseed = 7\n\n[output]\nmask_png = true\n",
        )
        .unwrap();
        assert_eq!(config.odc.seed, 7);
        assert_eq!(config.odc.bootstrap_samples, 100);
        assert!(config.output.mask_png);
        assert!(config.output.write_masks);
        assert_eq!(config.detection, DetectorConfig::default());
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = PipelineConfig::from_toml_str("[odc]\nseed = \"x\"").unwrap_err();
        assert!(matches!(err, SkyShieldError::Config(_)));
    }
}
