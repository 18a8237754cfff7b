//! Output type definitions.

use serde::{Deserialize, Serialize};

/// One classified segment of an audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSegment {
    /// Segment start in seconds.
    pub start_seconds: f32,
    /// Segment end in seconds.
    pub end_seconds: f32,
    /// Scientific name of the species.
    pub scientific_name: String,
    /// Common name of the species (possibly translated).
    pub common_name: String,
    /// Confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl PredictionSegment {
    /// Build a segment from a label in `ScientificName_CommonName` form.
    ///
    /// Labels without an underscore use the whole label for both names.
    pub fn from_label(label: &str, confidence: f32, start_seconds: f32, end_seconds: f32) -> Self {
        let (scientific_name, common_name) = label.split_once('_').map_or_else(
            || (label.to_string(), label.to_string()),
            |(scientific, common)| (scientific.to_string(), common.to_string()),
        );

        Self {
            start_seconds,
            end_seconds,
            scientific_name,
            common_name,
            confidence,
        }
    }
}

/// Pooled score of one species.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesScore {
    /// Species key (scientific name with `", "` replaced by `"_"`).
    pub species: String,
    /// Pooled confidence.
    pub score: f32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_from_label() {
        let segment =
            PredictionSegment::from_label("Myotis myotis_Greater Mouse-eared Bat", 0.9, 0.0, 1.0);
        assert_eq!(segment.scientific_name, "Myotis myotis");
        assert_eq!(segment.common_name, "Greater Mouse-eared Bat");
        assert_eq!(segment.confidence, 0.9);
    }

    #[test]
    fn test_segment_from_label_without_separator() {
        let segment = PredictionSegment::from_label("Noise", 0.4, 2.0, 3.0);
        assert_eq!(segment.scientific_name, "Noise");
        assert_eq!(segment.common_name, "Noise");
    }

    #[test]
    fn test_segment_serializes_field_names() {
        let segment =
            PredictionSegment::from_label("Myotis myotis_Greater Mouse-eared Bat", 0.5, 0.0, 1.0);
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["scientific_name"], "Myotis myotis");
        assert_eq!(json["start_seconds"], 0.0);
    }
}
