//! Degrees-minutes-seconds conversion for coordinate text
//!
//! Accepts the `DD°MM'SS"N DD°MM'SS"E` form used by receiver site lists and
//! produces the same form with whole arcseconds.

use crate::core::{GeoPoint, ARCSECONDS_PER_DEGREE};
use crate::validation::error::MlatError;

/// Parse a `DD°MM'SS"[N|S] DD°MM'SS"[E|W]` pair into decimal degrees
pub fn dms_to_decimal(input: &str) -> Result<GeoPoint, MlatError> {
    let parse_error = || MlatError::DmsParse { input: input.to_string() };

    let mut parts = input.split_whitespace();
    let (lat_text, lon_text) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat, lon),
        _ => return Err(parse_error()),
    };

    let latitude = parse_component(lat_text, ('N', 'S')).ok_or_else(parse_error)?;
    let longitude = parse_component(lon_text, ('E', 'W')).ok_or_else(parse_error)?;
    GeoPoint::new(latitude, longitude)
}

/// Parse one `DD°MM'SS"H` component; `hemispheres` is (positive, negative)
fn parse_component(text: &str, hemispheres: (char, char)) -> Option<f64> {
    let (degrees, rest) = text.split_once('°')?;
    let (minutes, rest) = rest.split_once('\'')?;
    let (seconds, hemisphere) = rest.split_once('"')?;

    let degrees: u32 = degrees.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let value = degrees as f64 + minutes as f64 / 60.0 + seconds / ARCSECONDS_PER_DEGREE;
    let mut chars = hemisphere.chars();
    match (chars.next()?.to_ascii_uppercase(), chars.next()) {
        (h, None) if h == hemispheres.0 => Some(value),
        (h, None) if h == hemispheres.1 => Some(-value),
        _ => None,
    }
}

/// Format one signed value as `D°M'SS"H`, rounded to the nearest arcsecond
fn format_component(value: f64, hemispheres: (char, char)) -> String {
    let total = (value.abs() * ARCSECONDS_PER_DEGREE).round() as u64;
    let degrees = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let hemisphere = if value < 0.0 { hemispheres.1 } else { hemispheres.0 };
    format!("{}°{}'{:02}\"{}", degrees, minutes, seconds, hemisphere)
}

/// Latitude and longitude as separate DMS strings
pub fn decimal_to_dms(point: &GeoPoint) -> (String, String) {
    (
        format_component(point.latitude(), ('N', 'S')),
        format_component(point.longitude(), ('E', 'W')),
    )
}

/// Point as a single `lat lon` DMS string, parseable by [`dms_to_decimal`]
pub fn format_dms(point: &GeoPoint) -> String {
    let (lat, lon) = decimal_to_dms(point);
    format!("{} {}", lat, lon)
}
