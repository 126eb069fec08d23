pub mod background;
pub mod context;
pub mod ephemeris;
pub mod odc;
pub mod sky_model;

pub use background::estimate_background;
pub use context::ObservationContext;
pub use ephemeris::{sky_geometry, SkyGeometry};
pub use odc::{
    estimate_odc, estimate_odc_from_backgrounds, OdcConfig, OdcMethod, OdcOutcome, OdcResult,
};
pub use sky_model::{
    estimate_odc_from_observed, natural_sky_brightness, natural_sky_for_context,
    NaturalSkyBrightness, OdcResidual, SkyModelConfig, SkyModelError,
};
