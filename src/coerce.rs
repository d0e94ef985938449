//! Parse-to-finite-float-or-absent helpers for loosely typed records.
//!
//! Account and report documents come from a schema-less store, so a
//! coordinate can show up as a number, a numeric string, `null`, or not at
//! all. Everything here maps that mess to `Option`, and the matcher only ever
//! sees validated [`GeoPoint`] values.

use serde_json::Value;

use crate::error::CoordError;
use crate::geo::GeoPoint;

pub fn parse_finite_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn finite_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_finite_str(s),
        _ => None,
    }
}

/// Both halves present, finite and in range, or the point is absent.
pub fn try_point_from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<GeoPoint, CoordError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon),
        _ => Err(CoordError::Missing),
    }
}

pub fn point_from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<GeoPoint> {
    try_point_from_parts(lat, lon).ok()
}

/// A report location typed on the command line.
pub fn source_point(lat: &str, lon: &str) -> Result<GeoPoint, CoordError> {
    try_point_from_parts(parse_finite_str(lat), parse_finite_str(lon))
}

/// Reads `object[lat_key]` / `object[lon_key]` as a point.
pub fn point_from_object(object: &Value, lat_key: &str, lon_key: &str) -> Option<GeoPoint> {
    point_from_parts(
        object.get(lat_key).and_then(finite_from_json),
        object.get(lon_key).and_then(finite_from_json),
    )
}

/// A report's `{latitude, longitude}` pair.
pub fn report_point(coordinates: &Value) -> Option<GeoPoint> {
    point_from_object(coordinates, "latitude", "longitude")
}
