//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::{overlap, sensitivity};

/// Parse and validate a bounded float value.
///
/// # Arguments
///
/// * `s` - The string to parse
/// * `min` - Minimum allowed value (inclusive)
/// * `max` - Maximum allowed value (inclusive)
/// * `name` - Name of the parameter for error messages
pub fn parse_bounded_float(s: &str, min: f64, max: f64, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(min..=max).contains(&value) {
        return Err(format!(
            "{name} must be between {min} and {max}, got {value}"
        ));
    }

    Ok(value)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_bounded_f32(s: &str, min: f32, max: f32, name: &str) -> Result<f32, String> {
    parse_bounded_float(s, f64::from(min), f64::from(max), name).map(|v| v as f32)
}

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    parse_bounded_f32(s, 0.0, 1.0, "confidence")
}

/// Parse and validate sigmoid sensitivity (0.5-1.5).
pub fn parse_sensitivity(s: &str) -> Result<f32, String> {
    parse_bounded_f32(s, sensitivity::MIN, sensitivity::MAX, "sensitivity")
}

/// Parse and validate segment overlap in seconds (0.0-2.99).
pub fn parse_overlap(s: &str) -> Result<f32, String> {
    parse_bounded_f32(s, overlap::MIN, overlap::DESKTOP_MAX, "overlap")
}

/// Parse and validate latitude value (-90.0 to 90.0).
pub fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, -90.0, 90.0, "latitude")
}

/// Parse and validate longitude value (-180.0 to 180.0).
pub fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, -180.0, 180.0, "longitude")
}
