//! Natural sky brightness: Moon, Rayleigh/airglow and twilight terms,
//! combined in flux.
//!
//! All brightnesses are surface brightnesses in mag/arcsec^2 (lower is
//! brighter). The lunar calibration zero point is provisional and kept in
//! [`SkyModelConfig`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
    AIRMASS_CAP, AIRMASS_SECANT_LIMIT_DEG, ATMOSPHERE_SCALE_HEIGHT_M, DARK_SKY_MAG,
    DEFAULT_EXTINCTION, LUNAR_CALIBRATION_OFFSET,
    MOON_HORIZON_CUTOFF_DEG, SIGNIFICANT_EXCESS_PERCENT, SKY_MODEL_VERSION, TWILIGHT_ASTRONOMICAL_MAG,
    TWILIGHT_CIVIL_MAG, TWILIGHT_NAUTICAL_MAG,
};

use super::context::ObservationContext;
use super::ephemeris::{sky_geometry, SkyGeometry};

#[derive(Error, Debug)]
pub enum SkyModelError {
    #[error("observation has no usable date/time")]
    MissingDatetime,

    #[error("sky model produced a non-finite {0}")]
    NonFinite(&'static str),
}

/// Tunable inputs of the natural sky model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyModelConfig {
    /// Atmospheric extinction coefficient, mag per airmass.
    #[serde(default = "default_extinction")]
    pub extinction: f64,
    /// Zero point converting lunar scattered flux to mag/arcsec^2.
    #[serde(default = "default_lunar_calibration")]
    pub lunar_calibration: f64,
}

fn default_extinction() -> f64 {
    DEFAULT_EXTINCTION
}
fn default_lunar_calibration() -> f64 {
    LUNAR_CALIBRATION_OFFSET
}

impl Default for SkyModelConfig {
    fn default() -> Self {
        Self {
            extinction: DEFAULT_EXTINCTION,
            lunar_calibration: LUNAR_CALIBRATION_OFFSET,
        }
    }
}

/// Modelled natural sky brightness and the geometry behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaturalSkyBrightness {
    pub total_sky_brightness: f64,
    pub lunar_component: f64,
    pub rayleigh_component: f64,
    pub twilight_component: f64,
    pub moon_altitude: f64,
    /// 0 = new, 180 = full.
    pub moon_phase_angle: f64,
    pub sun_altitude: f64,
    pub zenith_distance: f64,
    pub model_version: String,
}

/// Observed-minus-natural comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdcResidual {
    /// natural - observed; positive means the observed sky is brighter.
    pub odc_magnitude_diff: f64,
    pub odc_percent_flux: f64,
    pub observed_brightness: f64,
    pub natural_brightness: f64,
    pub excess_due_to_odc: bool,
    pub model_components: NaturalSkyBrightness,
}

/// Krisciunas & Schaefer (1991) style scattered moonlight.
///
/// Angles in degrees. `zenith_distance` stands in for the Moon-target
/// separation. Below the horizon cutoff, or for non-positive flux, the
/// dark-sky value is returned.
pub fn lunar_brightness(
    moon_altitude: f64,
    moon_phase_angle: f64,
    zenith_distance: f64,
    extinction: f64,
    calibration: f64,
) -> f64 {
    if moon_altitude < MOON_HORIZON_CUTOFF_DEG {
        return DARK_SKY_MAG;
    }

    let rho = zenith_distance.to_radians();
    let alpha = moon_phase_angle.to_radians();
    let h = moon_altitude.to_radians();

    let illuminance = 10f64.powf(-0.4 * (3.84 + 0.026 * alpha.abs() + 4e-9 * alpha.powi(4)));
    let moon_airmass = 1.0 / (h.sin() + 0.025 * (-11.0 * h.sin()).exp());
    let scattering = 10f64.powf(5.36) * (1.06 + rho.cos().powi(2));

    let flux = scattering
        * illuminance
        * 10f64.powf(-0.4 * extinction * moon_airmass)
        * (1.0 - 10f64.powf(-0.4 * extinction / rho.cos()));

    if flux > 0.0 && flux.is_finite() {
        -2.5 * flux.log10() + calibration
    } else {
        DARK_SKY_MAG
    }
}

/// Secant airmass below the limit, the fixed cap beyond it.
pub fn airmass(zenith_distance: f64) -> f64 {
    if zenith_distance < AIRMASS_SECANT_LIMIT_DEG {
        1.0 / zenith_distance.to_radians().cos()
    } else {
        AIRMASS_CAP
    }
}

/// Rayleigh scattering / airglow term with a scale-height pressure correction.
pub fn rayleigh_brightness(zenith_distance: f64, altitude_m: f64) -> f64 {
    let pressure_ratio = (-altitude_m / ATMOSPHERE_SCALE_HEIGHT_M).exp();
    DARK_SKY_MAG - 2.5 * (airmass(zenith_distance) * pressure_ratio).log10()
}

/// Step function of solar altitude.
pub fn twilight_brightness(sun_altitude: f64) -> f64 {
    if sun_altitude > -6.0 {
        TWILIGHT_CIVIL_MAG
    } else if sun_altitude > -12.0 {
        TWILIGHT_NAUTICAL_MAG
    } else if sun_altitude > -18.0 {
        TWILIGHT_ASTRONOMICAL_MAG
    } else {
        DARK_SKY_MAG
    }
}

/// Sum magnitudes in flux: `-2.5 log10(sum 10^(-0.4 m))`.
pub fn combine_magnitudes(mags: &[f64]) -> f64 {
    let flux: f64 = mags.iter().map(|m| 10f64.powf(-0.4 * m)).sum();
    -2.5 * flux.log10()
}

/// Evaluate the model for a known Sun/Moon geometry.
pub fn sky_brightness_for_geometry(
    geometry: &SkyGeometry,
    zenith_distance: f64,
    altitude_m: f64,
    extinction: f64,
    lunar_calibration: f64,
) -> NaturalSkyBrightness {
    let moon_phase_angle = geometry.moon_phase_angle();
    let lunar = lunar_brightness(
        geometry.moon_altitude,
        moon_phase_angle,
        zenith_distance,
        extinction,
        lunar_calibration,
    );
    let rayleigh = rayleigh_brightness(zenith_distance, altitude_m);
    let twilight = twilight_brightness(geometry.sun_altitude);

    NaturalSkyBrightness {
        total_sky_brightness: combine_magnitudes(&[lunar, rayleigh, twilight]),
        lunar_component: lunar,
        rayleigh_component: rayleigh,
        twilight_component: twilight,
        moon_altitude: geometry.moon_altitude,
        moon_phase_angle,
        sun_altitude: geometry.sun_altitude,
        zenith_distance,
        model_version: SKY_MODEL_VERSION.to_string(),
    }
}

/// Natural sky brightness at time `t` for a site at `lat`/`lon` degrees
/// (east positive) looking `zenith_distance` degrees from the zenith.
pub fn natural_sky_brightness(
    t: &DateTime<Utc>,
    lat: f64,
    lon: f64,
    zenith_distance: f64,
    altitude_m: f64,
    extinction: f64,
) -> NaturalSkyBrightness {
    let geometry = sky_geometry(t, lat, lon);
    sky_brightness_for_geometry(
        &geometry,
        zenith_distance,
        altitude_m,
        extinction,
        LUNAR_CALIBRATION_OFFSET,
    )
}

/// Run the model for an observation context. Needs a date/time; missing
/// site fields fall back to the context defaults (elevation 0 m).
pub fn natural_sky_for_context(
    ctx: &ObservationContext,
    config: &SkyModelConfig,
) -> Result<NaturalSkyBrightness, SkyModelError> {
    let t = ctx.datetime.ok_or(SkyModelError::MissingDatetime)?;
    let geometry = sky_geometry(&t, ctx.latitude(), ctx.longitude());
    let model = sky_brightness_for_geometry(
        &geometry,
        ctx.zenith_distance(),
        ctx.elevation(),
        config.extinction,
        config.lunar_calibration,
    );
    if !model.total_sky_brightness.is_finite() {
        return Err(SkyModelError::NonFinite("total sky brightness"));
    }
    Ok(model)
}

/// Compare an observed sky brightness with the natural model.
pub fn estimate_odc_from_observed(observed_mag: f64, model: &NaturalSkyBrightness) -> OdcResidual {
    let odc_mag = model.total_sky_brightness - observed_mag;
    let odc_percent = (10f64.powf(0.4 * odc_mag) - 1.0) * 100.0;
    OdcResidual {
        odc_magnitude_diff: odc_mag,
        odc_percent_flux: odc_percent,
        observed_brightness: observed_mag,
        natural_brightness: model.total_sky_brightness,
        excess_due_to_odc: odc_percent > SIGNIFICANT_EXCESS_PERCENT,
        model_components: model.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moon_below_cutoff_is_dark() {
        assert_eq!(lunar_brightness(-10.5, 180.0, 0.0, 0.25, 21.58), DARK_SKY_MAG);
    }

    #[test]
    fn risen_full_moon_brightens_the_sky() {
        let m = lunar_brightness(45.0, 180.0, 30.0, 0.25, 21.58);
        assert!(m.is_finite());
        assert!(m < DARK_SKY_MAG, "{m}");
    }

    #[test]
    fn airmass_is_capped_near_horizon() {
        assert_abs_diff_eq!(airmass(0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(airmass(60.0), 2.0, epsilon = 1e-9);
        assert_eq!(airmass(70.0), AIRMASS_CAP);
        assert_eq!(airmass(89.9), AIRMASS_CAP);
    }

    #[test]
    fn rayleigh_at_sea_level_zenith_is_dark_sky() {
        assert_abs_diff_eq!(rayleigh_brightness(0.0, 0.0), 22.0, epsilon = 1e-12);
        // Thinner air at altitude lowers the pressure term.
        assert!(rayleigh_brightness(0.0, 2400.0) > 22.0);
        assert!(rayleigh_brightness(60.0, 0.0) < 22.0);
    }

    #[test]
    fn twilight_steps() {
        assert_eq!(twilight_brightness(5.0), 10.0);
        assert_eq!(twilight_brightness(-6.0), 16.0);
        assert_eq!(twilight_brightness(-11.9), 16.0);
        assert_eq!(twilight_brightness(-12.0), 19.0);
        assert_eq!(twilight_brightness(-18.0), 22.0);
        assert_eq!(twilight_brightness(-40.0), 22.0);
    }

    #[test]
    fn equal_magnitudes_combine_brighter() {
        let m = combine_magnitudes(&[20.0, 20.0]);
        assert_abs_diff_eq!(m, 20.0 - 2.5 * 2f64.log10(), epsilon = 1e-12);
    }

    #[test]
    fn residual_sign_and_significance() {
        let geometry = SkyGeometry {
            moon_altitude: -30.0,
            moon_illumination: 0.0,
            sun_altitude: -40.0,
        };
        let model = sky_brightness_for_geometry(&geometry, 0.0, 0.0, 0.25, 21.58);
        let same = estimate_odc_from_observed(model.total_sky_brightness, &model);
        assert_abs_diff_eq!(same.odc_percent_flux, 0.0, epsilon = 1e-9);
        assert!(!same.excess_due_to_odc);

        let brighter = estimate_odc_from_observed(model.total_sky_brightness - 0.1, &model);
        assert!(brighter.odc_magnitude_diff > 0.0);
        assert!(brighter.excess_due_to_odc);
    }

    #[test]
    fn context_without_time_is_an_error() {
        let ctx = ObservationContext::default();
        assert!(matches!(
            natural_sky_for_context(&ctx, &SkyModelConfig::default()),
            Err(SkyModelError::MissingDatetime)
        ));
    }
}
