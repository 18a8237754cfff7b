//! Request metadata parsing.
//!
//! The `meta` form field is a JSON object. Numeric fields accept JSON numbers
//! or numeric strings; every value is clamped to its server range.

use crate::config::{Location, RunConfiguration};
use crate::constants::{overlap, pooling, sensitivity, species_filter};
use crate::output::PoolingMode;
use serde_json::{Map, Value};

/// Parsed, clamped request metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMeta {
    /// Recording location; `None` disables the species filter.
    pub location: Option<Location>,
    /// Week of the year (1-48); `None` means year-round.
    pub week: Option<u8>,
    /// Segment overlap in seconds.
    pub overlap: f32,
    /// Sigmoid sensitivity after the server transform.
    pub sensitivity: f32,
    /// Species filter threshold.
    pub sf_thresh: f32,
    /// Persist the upload and a JSON sidecar.
    pub save: bool,
    /// Pooling mode of the summary.
    pub pmode: PoolingMode,
    /// Number of pooled species in the summary.
    pub num_results: usize,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            location: None,
            week: None,
            overlap: 0.0,
            sensitivity: server_sensitivity(1.0),
            sf_thresh: species_filter::DEFAULT_THRESHOLD,
            save: false,
            pmode: PoolingMode::Avg,
            num_results: pooling::DEFAULT_TOP_N,
        }
    }
}

impl RequestMeta {
    /// Parse metadata fields.
    ///
    /// Returns a description of the first malformed field.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, String> {
        let defaults = Self::default();

        // Coordinates are only read as a pair.
        let location = if map.contains_key("lat") && map.contains_key("lon") {
            match (number(map, "lat")?, number(map, "lon")?) {
                (Some(lat), Some(lon)) if !is_unset(lat) && !is_unset(lon) => Some(Location {
                    latitude: lat,
                    longitude: lon,
                }),
                _ => None,
            }
        } else {
            None
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let week = number(map, "week")?
            .map(f64::trunc)
            .filter(|w| (1.0..=f64::from(species_filter::WEEKS_PER_YEAR)).contains(w))
            .map(|w| w as u8);

        #[allow(clippy::cast_possible_truncation)]
        let overlap = number(map, "overlap")?.map_or(defaults.overlap, |v| {
            (v as f32).clamp(overlap::MIN, overlap::SERVER_MAX)
        });

        #[allow(clippy::cast_possible_truncation)]
        let sensitivity = number(map, "sensitivity")?
            .map_or(defaults.sensitivity, |v| server_sensitivity(v as f32));

        #[allow(clippy::cast_possible_truncation)]
        let sf_thresh = number(map, "sf_thresh")?.map_or(defaults.sf_thresh, |v| {
            (v as f32).clamp(
                species_filter::MIN_THRESHOLD,
                species_filter::MAX_THRESHOLD,
            )
        });

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let num_results = number(map, "num_results")?.map_or(defaults.num_results, |v| {
            v.trunc().clamp(1.0, pooling::MAX_TOP_N as f64) as usize
        });

        let pmode = map
            .get("pmode")
            .and_then(Value::as_str)
            .map_or(defaults.pmode, PoolingMode::from_name);

        Ok(Self {
            location,
            week,
            overlap,
            sensitivity,
            sf_thresh,
            save: save_flag(map),
            pmode,
            num_results,
        })
    }

    /// Apply the request overrides to a request-scoped configuration.
    ///
    /// The species list is not touched; narrowing needs the species filter.
    pub fn apply(&self, config: &mut RunConfiguration) {
        config.location = self.location;
        config.week = self.week;
        config.overlap = self.overlap;
        config.sensitivity = self.sensitivity;
        config.species_filter_threshold = self.sf_thresh;
    }
}

/// Parse the raw `meta` form value.
///
/// Missing or blank values yield an empty object. Returns `None` when the
/// value is not a JSON object.
pub fn parse_meta_field(raw: Option<&str>) -> Option<Map<String, Value>> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Some(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Server sensitivity transform: `clamp(1 - (s - 1), 0.5, 1.5)`.
///
/// Higher requested values make the sigmoid less steep, the inverse of the
/// desktop slider.
pub fn server_sensitivity(requested: f32) -> f32 {
    (1.0 - (requested - 1.0)).clamp(sensitivity::MIN, sensitivity::MAX)
}

/// Read the `save` flag leniently.
pub fn save_flag(map: &Map<String, Value>) -> bool {
    match map.get("save") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    }
}

/// Coordinates of `-1` mean "not set".
fn is_unset(value: f64) -> bool {
    (value + 1.0).abs() < f64::EPSILON
}

fn number(map: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    let Some(raw) = map.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("invalid value for '{key}': {raw}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Result<RequestMeta, String> {
        match value {
            Value::Object(map) => RequestMeta::from_map(&map),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_defaults_for_empty_meta() {
        let parsed = meta(json!({})).unwrap();
        assert_eq!(parsed, RequestMeta::default());
        assert_eq!(parsed.sensitivity, 1.0);
        assert_eq!(parsed.sf_thresh, 0.03);
        assert_eq!(parsed.num_results, 5);
    }

    #[test]
    fn test_clamps_ranges() {
        let parsed = meta(json!({
            "overlap": 5.0,
            "sensitivity": -3.0,
            "sf_thresh": 0.0,
            "num_results": 500,
        }))
        .unwrap();

        assert!((parsed.overlap - 2.9).abs() < 1e-6);
        assert_eq!(parsed.sensitivity, 1.5);
        assert!((parsed.sf_thresh - 0.01).abs() < 1e-6);
        assert_eq!(parsed.num_results, 99);

        let parsed = meta(json!({ "overlap": -1, "sf_thresh": 2, "num_results": 0 })).unwrap();
        assert_eq!(parsed.overlap, 0.0);
        assert!((parsed.sf_thresh - 0.99).abs() < 1e-6);
        assert_eq!(parsed.num_results, 1);
    }

    #[test]
    fn test_server_sensitivity_stays_in_range() {
        for requested in [-100.0, -1.0, 0.0, 0.25, 0.5, 1.0, 1.25, 1.5, 2.0, 100.0] {
            let s = server_sensitivity(requested);
            assert!((0.5..=1.5).contains(&s), "{requested} -> {s}");
        }
        assert_eq!(server_sensitivity(1.25), 0.75);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let parsed = meta(json!({ "lat": "49.5", "lon": "11.1", "week": "20", "overlap": "1.5" }))
            .unwrap();
        assert_eq!(
            parsed.location,
            Some(Location {
                latitude: 49.5,
                longitude: 11.1
            })
        );
        assert_eq!(parsed.week, Some(20));
        assert_eq!(parsed.overlap, 1.5);
    }

    #[test]
    fn test_malformed_number_is_reported() {
        let err = meta(json!({ "overlap": "lots" })).unwrap_err();
        assert!(err.contains("overlap"));

        assert!(meta(json!({ "sensitivity": "NaN" })).is_err());
        assert!(meta(json!({ "week": [1] })).is_err());
    }

    #[test]
    fn test_location_requires_both_coordinates() {
        assert_eq!(meta(json!({ "lat": 49.0 })).unwrap().location, None);
        assert_eq!(meta(json!({ "lat": -1, "lon": -1 })).unwrap().location, None);
        assert!(meta(json!({ "lat": 49.0, "lon": 11.0 })).unwrap().location.is_some());
    }

    #[test]
    fn test_lone_coordinate_is_ignored_even_if_malformed() {
        assert_eq!(meta(json!({ "lat": "north" })).unwrap().location, None);
        assert_eq!(meta(json!({ "lon": [11] })).unwrap().location, None);
        assert!(meta(json!({ "lat": "north", "lon": 11.0 })).is_err());
    }

    #[test]
    fn test_week_outside_year_is_year_round() {
        assert_eq!(meta(json!({ "week": -1 })).unwrap().week, None);
        assert_eq!(meta(json!({ "week": 49 })).unwrap().week, None);
        assert_eq!(meta(json!({ "week": 48 })).unwrap().week, Some(48));
    }

    #[test]
    fn test_pmode_and_save() {
        let parsed = meta(json!({ "pmode": "MAX", "save": true })).unwrap();
        assert_eq!(parsed.pmode, PoolingMode::Max);
        assert!(parsed.save);

        let parsed = meta(json!({ "pmode": "median", "save": "false" })).unwrap();
        assert_eq!(parsed.pmode, PoolingMode::Avg);
        assert!(!parsed.save);
    }

    #[test]
    fn test_parse_meta_field() {
        assert_eq!(parse_meta_field(None), Some(Map::new()));
        assert_eq!(parse_meta_field(Some("  ")), Some(Map::new()));
        assert!(parse_meta_field(Some(r#"{"save": true}"#)).is_some());
        assert_eq!(parse_meta_field(Some("[1, 2]")), None);
        assert_eq!(parse_meta_field(Some("{broken")), None);
    }
}
