//! The encoded polyline format used by directions providers.
//!
//! Each coordinate is stored as the delta from the previous point, scaled by 1e5, zig-zag encoded, and split into
//! 5-bit chunks offset by 63 so every chunk is a printable ASCII character.
use ride_common::{GeoCoordinates, GeoPolyline};

use crate::DirectionsApiError;

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CONTINUATION_BIT: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;
const ASCII_OFFSET: u8 = 63;
// 32 bits is enough for any valid coordinate delta (±360 * 1e5 shifted left by one).
const MAX_SHIFT: u32 = 32;

/// Decodes an encoded polyline into its points.
pub fn decode_polyline(encoded: &str) -> Result<GeoPolyline, DirectionsApiError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lng = 0i64;
    let mut points = Vec::new();
    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(DirectionsApiError::InvalidPolyline(format!(
                "'{encoded}' ends with a latitude that has no matching longitude"
            )));
        }
        lng += next_value(bytes, &mut index)?;
        #[allow(clippy::cast_precision_loss)]
        points.push(GeoCoordinates::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }
    Ok(GeoPolyline::new(points))
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, DirectionsApiError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| DirectionsApiError::InvalidPolyline("polyline ends in the middle of a value".into()))?;
        *index += 1;
        if !(ASCII_OFFSET..=ASCII_OFFSET + 63).contains(&byte) {
            return Err(DirectionsApiError::InvalidPolyline(format!("unexpected character '{}'", byte as char)));
        }
        let chunk = i64::from(byte - ASCII_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
        if shift > MAX_SHIFT {
            return Err(DirectionsApiError::InvalidPolyline("value is too long".into()));
        }
    }
    let value = if result & 1 == 1 { !(result >> 1) } else { result >> 1 };
    Ok(value)
}

/// Encodes a polyline. Coordinates are rounded to 5 decimal places.
pub fn encode_polyline(polyline: &GeoPolyline) -> String {
    let mut encoded = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;
    for point in polyline.points() {
        #[allow(clippy::cast_possible_truncation)]
        let lat = (point.latitude * PRECISION).round() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let lng = (point.longitude * PRECISION).round() as i64;
        push_value(lat - prev_lat, &mut encoded);
        push_value(lng - prev_lng, &mut encoded);
        prev_lat = lat;
        prev_lng = lng;
    }
    encoded
}

fn push_value(delta: i64, out: &mut String) {
    let mut value = delta << 1;
    if delta < 0 {
        value = !value;
    }
    while value >= CONTINUATION_BIT {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        out.push((((value & CHUNK_MASK) | CONTINUATION_BIT) as u8 + ASCII_OFFSET) as char);
        value >>= CHUNK_BITS;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    out.push((value as u8 + ASCII_OFFSET) as char);
}
