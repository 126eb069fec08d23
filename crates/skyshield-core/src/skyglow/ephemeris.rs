//! Low-precision analytic Sun and Moon positions.
//!
//! Series from the Astronomical Almanac "low precision" formulae: about
//! 0.01 deg for the Sun and 0.3 deg for the Moon over 1950-2050, far below
//! what the sky brightness model can resolve. Altitudes are apparent, with
//! standard-atmosphere refraction applied.

use chrono::{DateTime, Utc};

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const EARTH_RADIUS_AU: f64 = 6378.14 / 149_597_870.7;

/// Standard atmosphere used for refraction.
const REFRACTION_TEMPERATURE_C: f64 = 15.0;
const REFRACTION_PRESSURE_MBAR: f64 = 1010.0;

/// Right ascension / declination in degrees, plus geocentric distance in AU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Equatorial {
    pub ra: f64,
    pub dec: f64,
    pub distance_au: f64,
}

/// Sun and Moon geometry seen from one site at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyGeometry {
    /// Apparent Moon altitude, degrees.
    pub moon_altitude: f64,
    /// Illuminated fraction of the lunar disc, 0 (new) to 1 (full).
    pub moon_illumination: f64,
    /// Apparent Sun altitude, degrees.
    pub sun_altitude: f64,
}

impl SkyGeometry {
    /// Phase on a 0 (new) to 180 (full) degree scale: illuminated fraction
    /// times 180.
    pub fn moon_phase_angle(&self) -> f64 {
        self.moon_illumination * 180.0
    }
}

pub fn julian_day(t: &DateTime<Utc>) -> f64 {
    let seconds = t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9;
    seconds / 86_400.0 + UNIX_EPOCH_JD
}

/// Greenwich mean sidereal time in degrees, [0, 360).
pub fn gmst_degrees(jd: f64) -> f64 {
    let d = jd - J2000;
    let t = d / 36_525.0;
    (280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t - t * t * t / 38_710_000.0)
        .rem_euclid(360.0)
}

pub fn sun_position(jd: f64) -> Equatorial {
    let d = jd - J2000;
    let mean_longitude = 280.460 + 0.985_647_4 * d;
    let g = (357.528 + 0.985_600_3 * d).to_radians();
    let lambda = (mean_longitude + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
    let distance_au = 1.000_14 - 0.016_71 * g.cos() - 0.000_14 * (2.0 * g).cos();
    let (ra, dec) = ecliptic_to_equatorial(lambda, 0.0, obliquity(d));
    Equatorial {
        ra,
        dec,
        distance_au,
    }
}

/// Geocentric Moon position and its equatorial horizontal parallax (deg).
pub fn moon_position(jd: f64) -> (Equatorial, f64) {
    let t = (jd - J2000) / 36_525.0;
    let s = |a: f64, b: f64| (a + b * t).to_radians().sin();
    let c = |a: f64, b: f64| (a + b * t).to_radians().cos();

    let lambda = 218.32 + 481_267.881 * t + 6.29 * s(135.0, 477_198.87)
        - 1.27 * s(259.3, -413_335.36)
        + 0.66 * s(235.7, 890_534.22)
        + 0.21 * s(269.9, 954_397.74)
        - 0.19 * s(357.5, 35_999.05)
        - 0.11 * s(186.5, 966_404.03);
    let beta = 5.13 * s(93.3, 483_202.02) + 0.28 * s(228.2, 960_400.89)
        - 0.28 * s(318.3, 6_003.15)
        - 0.17 * s(217.6, -407_332.21);
    let parallax = 0.9508
        + 0.0518 * c(135.0, 477_198.87)
        + 0.0095 * c(259.3, -413_335.36)
        + 0.0078 * c(235.7, 890_534.22)
        + 0.0028 * c(269.9, 954_397.74);

    let (ra, dec) = ecliptic_to_equatorial(
        lambda.to_radians(),
        beta.to_radians(),
        obliquity(jd - J2000),
    );
    let distance_au = EARTH_RADIUS_AU / parallax.to_radians().sin();
    (
        Equatorial {
            ra,
            dec,
            distance_au,
        },
        parallax,
    )
}

/// Geometric altitude (deg) of an equatorial position for an observer at
/// `lat`/`lon` degrees (east positive).
pub fn geometric_altitude(pos: &Equatorial, jd: f64, lat: f64, lon: f64) -> f64 {
    let hour_angle = (gmst_degrees(jd) + lon - pos.ra).to_radians();
    let (lat, dec) = (lat.to_radians(), pos.dec.to_radians());
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Refraction (deg) for an observed altitude; zero outside [-1, 89.9].
pub fn refraction(alt: f64) -> f64 {
    if !(-1.0..=89.9).contains(&alt) {
        return 0.0;
    }
    let r = 0.016_667 / (alt + 7.31 / (alt + 4.4)).to_radians().tan();
    r * (0.28 * REFRACTION_PRESSURE_MBAR / (REFRACTION_TEMPERATURE_C + 273.0))
}

/// Apparent altitude from a true one, iterating the refraction formula.
pub fn refract(alt: f64) -> f64 {
    let mut apparent = alt;
    for _ in 0..10 {
        let next = alt + refraction(apparent);
        if (next - apparent).abs() < 3.0e-5 {
            return next;
        }
        apparent = next;
    }
    apparent
}

/// Sun altitude, Moon altitude (with topocentric parallax) and Moon
/// illumination at `t` for a site at `lat`/`lon` degrees.
pub fn sky_geometry(t: &DateTime<Utc>, lat: f64, lon: f64) -> SkyGeometry {
    let jd = julian_day(t);
    let sun = sun_position(jd);
    let (moon, parallax) = moon_position(jd);

    let sun_alt = geometric_altitude(&sun, jd, lat, lon);
    let moon_geo_alt = geometric_altitude(&moon, jd, lat, lon);
    let moon_alt = moon_geo_alt - parallax * moon_geo_alt.to_radians().cos();

    SkyGeometry {
        moon_altitude: refract(moon_alt),
        moon_illumination: illuminated_fraction(&sun, &moon),
        sun_altitude: refract(sun_alt),
    }
}

/// Illuminated fraction of the Moon from the Sun-Moon elongation.
pub fn illuminated_fraction(sun: &Equatorial, moon: &Equatorial) -> f64 {
    let (ds, dm) = (sun.dec.to_radians(), moon.dec.to_radians());
    let dra = (sun.ra - moon.ra).to_radians();
    let cos_elong = ds.sin() * dm.sin() + ds.cos() * dm.cos() * dra.cos();
    let elongation = cos_elong.clamp(-1.0, 1.0).acos();
    let phase = (sun.distance_au * elongation.sin())
        .atan2(moon.distance_au - sun.distance_au * elongation.cos());
    (1.0 + phase.cos()) / 2.0
}

fn obliquity(days_since_j2000: f64) -> f64 {
    (23.439 - 0.000_000_4 * days_since_j2000).to_radians()
}

/// Ecliptic longitude/latitude (rad) to (ra, dec) in degrees, ra in [0, 360).
fn ecliptic_to_equatorial(lambda: f64, beta: f64, eps: f64) -> (f64, f64) {
    let sin_dec = beta.sin() * eps.cos() + beta.cos() * eps.sin() * lambda.sin();
    let dec = sin_dec.clamp(-1.0, 1.0).asin();
    let ra = (lambda.sin() * eps.cos() - beta.tan() * eps.sin()).atan2(lambda.cos());
    (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
}
