//! Sextant coordinate codec.
//!
//! The game reports positions as degree/minute strings like
//! `55o54'N, 72o42'E`. This module turns those back into world tile
//! coordinates on the base facet:
//!
//! 1. each axis is anchored at the world position of 0°/0'
//!    (x 1323, y 1624)
//! 2. north and west move toward smaller coordinates, south and east
//!    toward larger ones, scaled so 360° spans the whole facet
//! 3. the result is truncated to a tile and wrapped once into the
//!    toroidal 5120 x 4096 base facet

use glam::IVec2;
use miette::Diagnostic;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Base facet dimensions in tiles. Sextant coordinates only exist on the
/// base facets, so the codec always wraps against these.
pub const BASE_FACET_WIDTH: i32 = 5120;
pub const BASE_FACET_HEIGHT: i32 = 4096;

/// world position of the 0°/0' anchor
const LON_ANCHOR_X: f64 = 1323.0;
const LAT_ANCHOR_Y: f64 = 1624.0;

#[derive(Debug, Error, Diagnostic)]
pub enum GeoError {
    #[error("expected two comma separated segments like \"55o54'N, 72o42'E\"")]
    #[diagnostic(code(terramap::geo::missing_segment))]
    MissingSegment,

    #[error("segment {0:?} has no degree sign (o or °)")]
    #[diagnostic(code(terramap::geo::no_degree_sign))]
    NoDegreeSign(String),

    #[error("segment {0:?} has no minute mark (')")]
    #[diagnostic(code(terramap::geo::no_minute_mark))]
    NoMinuteMark(String),

    #[error("segment {0:?} has a non numeric degree or minute value")]
    #[diagnostic(code(terramap::geo::bad_number))]
    BadNumber(String),

    #[error("hemisphere {found:?} is not one of {expected}")]
    #[diagnostic(code(terramap::geo::bad_hemisphere))]
    BadHemisphere {
        found: char,
        expected: &'static str,
    },

    #[error("location {0:?} is neither an x y pair nor a sextant coordinate")]
    #[diagnostic(code(terramap::geo::bad_location))]
    BadLocation(String),
}

/// Convert a sextant coordinate string to a base facet world position.
///
/// The latitude segment (N/S) comes first and maps to y, the longitude
/// segment (E/W) maps to x. `o` is accepted in place of the degree sign and
/// whitespace around the numbers is ignored. Out of range results wrap once
/// around the facet.
pub fn parse_sextant(text: &str) -> Result<IVec2, GeoError> {
    let mut segments = text.split(',');
    let lat = segments.next().ok_or(GeoError::MissingSegment)?;
    let lon = segments.next().ok_or(GeoError::MissingSegment)?;

    let (lat_degrees, lat_minutes, lat_hemisphere) = split_segment(lat)?;
    let scale_y = BASE_FACET_HEIGHT as f64 / 360.0;
    let y = match lat_hemisphere {
        'N' => LAT_ANCHOR_Y - (lat_minutes / 60.0) * scale_y - lat_degrees * scale_y,
        'S' => LAT_ANCHOR_Y + (lat_minutes / 60.0) * scale_y + lat_degrees * scale_y,
        found => {
            return Err(GeoError::BadHemisphere {
                found,
                expected: "N or S",
            })
        }
    } as i32;

    let (lon_degrees, lon_minutes, lon_hemisphere) = split_segment(lon)?;
    let scale_x = BASE_FACET_WIDTH as f64 / 360.0;
    let x = match lon_hemisphere {
        'W' => LON_ANCHOR_X - (lon_minutes / 60.0) * scale_x - lon_degrees * scale_x,
        'E' => LON_ANCHOR_X + (lon_minutes / 60.0) * scale_x + lon_degrees * scale_x,
        found => {
            return Err(GeoError::BadHemisphere {
                found,
                expected: "E or W",
            })
        }
    } as i32;

    Ok(IVec2::new(
        wrap(x, BASE_FACET_WIDTH),
        wrap(y, BASE_FACET_HEIGHT),
    ))
}

/// Parse a free form location: either a plain `x y` tile pair or a sextant
/// coordinate string.
pub fn parse_location(text: &str) -> Result<IVec2, GeoError> {
    let mut tokens = text.split_whitespace();
    if let (Some(first), Some(second)) = (tokens.next(), tokens.next()) {
        if let (Ok(x), Ok(y)) = (first.parse(), second.parse()) {
            return Ok(IVec2::new(x, y));
        }
    }
    parse_sextant(text).map_err(|e| match e {
        GeoError::BadHemisphere { .. } | GeoError::BadNumber(_) => e,
        _ => GeoError::BadLocation(text.to_string()),
    })
}

/// Find the first sextant coordinate embedded in free text, for example the
/// body of a rescue note. Returns the matched substring.
pub fn find_sextant(text: &str) -> Option<&str> {
    static SEXTANT: OnceLock<Regex> = OnceLock::new();
    let pattern = SEXTANT
        .get_or_init(|| Regex::new(r"\d+[o°]\s?\d+'[NS],\s+\d+[o°]\s?\d+'[EW]").unwrap());
    pattern.find(text).map(|m| m.as_str())
}

/// Split one segment into (degrees, minutes, hemisphere letter).
fn split_segment(segment: &str) -> Result<(f64, f64, char), GeoError> {
    let segment = segment.trim();
    let (degrees, rest) = segment
        .split_once(['°', 'o'])
        .ok_or_else(|| GeoError::NoDegreeSign(segment.to_string()))?;
    let (minutes, _) = rest
        .split_once('\'')
        .ok_or_else(|| GeoError::NoMinuteMark(segment.to_string()))?;
    let degrees: f64 = degrees
        .trim()
        .parse()
        .map_err(|_| GeoError::BadNumber(segment.to_string()))?;
    let minutes: f64 = minutes
        .trim()
        .parse()
        .map_err(|_| GeoError::BadNumber(segment.to_string()))?;
    // the hemisphere letter is the last character of the segment
    let hemisphere = segment
        .chars()
        .next_back()
        .ok_or(GeoError::MissingSegment)?;
    Ok((degrees, minutes, hemisphere))
}

/// Wrap a coordinate once into `[0, range]`. A single application matches
/// how far a sextant string can put a point outside the facet.
fn wrap(value: i32, range: i32) -> i32 {
    if value < 0 {
        value + range
    } else if value > range {
        value - range
    } else {
        value
    }
}
