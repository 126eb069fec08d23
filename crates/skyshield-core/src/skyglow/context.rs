use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::AIRMASS_SECANT_LIMIT_DEG;
use crate::frame::{FrameHeader, HeaderValue};

/// Observation metadata relevant to the natural sky model.
///
/// Every field is optional; the accessor methods apply the fallback defaults
/// (equator, sea level, zenith pointing, airmass 1, filter "Unknown",
/// zero exposure).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationContext {
    pub datetime: Option<DateTime<Utc>>,
    pub site_latitude: Option<f64>,
    pub site_longitude: Option<f64>,
    pub elevation_m: Option<f64>,
    pub zenith_distance: Option<f64>,
    pub airmass: Option<f64>,
    pub filter: Option<String>,
    pub exposure_s: Option<f64>,
    /// True when a date/time, a site latitude or a pointing was found.
    pub has_metadata: bool,
}

impl ObservationContext {
    /// Extract the context from a FITS-style header.
    pub fn from_header(header: &FrameHeader) -> Self {
        let datetime = header.get_str("DATE-OBS").and_then(parse_datetime);
        let site_latitude = header_angle(header, &["SITELAT", "LATITUDE"]);
        let site_longitude = header_angle(header, &["SITELONG", "LONGITUD"]);
        let elevation_m = header
            .get_any(&["SITEELEV", "ELEVATIO"])
            .and_then(HeaderValue::as_f64);
        let zenith_distance = header_angle(header, &["ALTITUDE", "ALT"]).map(|alt| 90.0 - alt);

        let airmass = header.get_f64("AIRMASS").or_else(|| {
            zenith_distance
                .filter(|z| *z < AIRMASS_SECANT_LIMIT_DEG)
                .map(|z| 1.0 / z.to_radians().cos())
        });

        let exposure_s = header
            .get_any(&["EXPTIME", "EXPOSURE"])
            .and_then(HeaderValue::as_f64);
        let filter = header
            .get_any(&["FILTER", "FILTNAM"])
            .map(|v| v.to_string().trim().to_string());

        let has_metadata =
            datetime.is_some() || site_latitude.is_some() || zenith_distance.is_some();

        Self {
            datetime,
            site_latitude,
            site_longitude,
            elevation_m,
            zenith_distance,
            airmass,
            filter,
            exposure_s,
            has_metadata,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.site_latitude.unwrap_or(0.0)
    }

    pub fn longitude(&self) -> f64 {
        self.site_longitude.unwrap_or(0.0)
    }

    pub fn elevation(&self) -> f64 {
        self.elevation_m.unwrap_or(0.0)
    }

    pub fn zenith_distance(&self) -> f64 {
        self.zenith_distance.unwrap_or(0.0)
    }

    pub fn airmass(&self) -> f64 {
        self.airmass.unwrap_or(1.0)
    }

    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or("Unknown")
    }

    pub fn exposure(&self) -> f64 {
        self.exposure_s.unwrap_or(0.0)
    }
}

/// Angle in decimal degrees from a numeric value or a sexagesimal string.
fn header_angle(header: &FrameHeader, keys: &[&str]) -> Option<f64> {
    let value = header.get_any(keys)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(parse_sexagesimal))
}

/// Parse `"-30:14:16.5"` or `"-30 14 16.5"` into decimal degrees.
pub fn parse_sexagesimal(s: &str) -> Option<f64> {
    let s = s.trim();
    let negative = s.starts_with('-');
    let parts: Vec<f64> = s
        .trim_start_matches(['-', '+'])
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let value = parts
        .iter()
        .zip([1.0, 60.0, 3600.0])
        .map(|(p, scale)| p / scale)
        .sum::<f64>();
    Some(if negative { -value } else { value })
}

/// ISO-8601 date/time, with or without fractional seconds, a `Z`/offset
/// suffix or a time part at all. Naive values are taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sexagesimal_forms() {
        assert_abs_diff_eq!(parse_sexagesimal("-30:15:00").unwrap(), -30.25, epsilon = 1e-12);
        assert_abs_diff_eq!(parse_sexagesimal("+70 30").unwrap(), 70.5, epsilon = 1e-12);
        assert_eq!(parse_sexagesimal("north"), None);
        assert_eq!(parse_sexagesimal(""), None);
    }

    #[test]
    fn datetime_forms() {
        let a = parse_datetime("2024-03-05T21:10:03.250").unwrap();
        assert_eq!((a.hour(), a.minute(), a.second()), (21, 10, 3));
        let b = parse_datetime("2024-03-05T21:10:03Z").unwrap();
        assert_eq!(b.minute(), 10);
        let c = parse_datetime("2024-03-05").unwrap();
        assert_eq!((c.day(), c.hour()), (5, 0));
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn empty_header_uses_defaults() {
        let ctx = ObservationContext::from_header(&FrameHeader::new());
        assert!(!ctx.has_metadata);
        assert_eq!(ctx.latitude(), 0.0);
        assert_eq!(ctx.zenith_distance(), 0.0);
        assert_eq!(ctx.airmass(), 1.0);
        assert_eq!(ctx.filter(), "Unknown");
        assert_eq!(ctx.exposure(), 0.0);
    }

    #[test]
    fn header_fields_are_extracted() {
        let mut h = FrameHeader::new();
        h.set("DATE-OBS", HeaderValue::Str("2024-01-25T03:00:00".into()));
        h.set("LATITUDE", HeaderValue::Str("-30:14:16".into()));
        h.set("SITELONG", HeaderValue::Float(-70.74));
        h.set("ALT", HeaderValue::Float(60.0));
        h.set("EXPTIME", HeaderValue::Int(30));
        h.set("FILTER", HeaderValue::Str("V".into()));

        let ctx = ObservationContext::from_header(&h);
        assert!(ctx.has_metadata);
        assert!(ctx.datetime.is_some());
        assert_abs_diff_eq!(ctx.latitude(), -30.237_777_8, epsilon = 1e-6);
        assert_abs_diff_eq!(ctx.longitude(), -70.74, epsilon = 1e-12);
        assert_abs_diff_eq!(ctx.zenith_distance(), 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ctx.airmass(), 1.0 / 30f64.to_radians().cos(), epsilon = 1e-12);
        assert_eq!(ctx.exposure(), 30.0);
        assert_eq!(ctx.filter(), "V");
    }

    #[test]
    fn low_pointing_has_no_derived_airmass() {
        let mut h = FrameHeader::new();
        h.set("ALTITUDE", HeaderValue::Float(10.0));
        let ctx = ObservationContext::from_header(&h);
        assert_eq!(ctx.airmass, None);
        assert_eq!(ctx.airmass(), 1.0);
    }
}
