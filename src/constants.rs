//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "battyd";

/// Default minimum confidence threshold for detections.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.1;

/// Default sigmoid sensitivity.
pub const DEFAULT_SENSITIVITY: f32 = 1.0;

/// Default segment overlap in seconds.
pub const DEFAULT_OVERLAP: f32 = 0.0;

/// Default batch size for inference.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default thread count for analysis runs.
pub const DEFAULT_THREADS: usize = 4;

/// Locale that never triggers a translated label lookup.
pub const BASE_LOCALE: &str = "en";

/// Audio file extensions accepted by the analyzer.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "wma", "aiff", "aif"];

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for confidence formatting.
    pub const DECIMAL_PLACES: usize = 4;
}

/// Sensitivity bounds shared by the desktop slider and the server clamp.
pub mod sensitivity {
    /// Lowest sensitivity.
    pub const MIN: f32 = 0.5;
    /// Highest sensitivity.
    pub const MAX: f32 = 1.5;
}

/// Segment overlap bounds.
pub mod overlap {
    /// Lowest overlap in seconds.
    pub const MIN: f32 = 0.0;
    /// Highest overlap accepted by the desktop path.
    pub const DESKTOP_MAX: f32 = 2.99;
    /// Highest overlap accepted by the server.
    pub const SERVER_MAX: f32 = 2.9;
}

/// Species filter (location) threshold constants.
pub mod species_filter {
    /// Default occurrence threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.03;
    /// Lowest threshold accepted by the server.
    pub const MIN_THRESHOLD: f32 = 0.01;
    /// Highest threshold accepted by the server.
    pub const MAX_THRESHOLD: f32 = 0.99;
    /// Number of weeks in the species model year.
    pub const WEEKS_PER_YEAR: u8 = 48;
}

/// Result pooling constants.
pub mod pooling {
    /// Default number of pooled species returned.
    pub const DEFAULT_TOP_N: usize = 5;
    /// Largest accepted number of pooled species.
    pub const MAX_TOP_N: usize = 99;
}

/// Signal profiles for the model families.
pub mod signal {
    /// Sample rate of the 256 kHz bat models.
    pub const BAT_256K_SAMPLE_RATE: u32 = 256_000;
    /// Sample rate of the 144 kHz bat models.
    pub const BAT_144K_SAMPLE_RATE: u32 = 144_000;
    /// Segment length of the bat models in seconds.
    pub const BAT_SEGMENT_LENGTH: f32 = 1.0;
    /// Sample rate of the bird models.
    pub const BIRD_SAMPLE_RATE: u32 = 48_000;
    /// Segment length of the bird models in seconds.
    pub const BIRD_SEGMENT_LENGTH: f32 = 3.0;
}

/// Default file system locations.
pub mod paths {
    /// Directory holding the bat classifiers and their label files.
    pub const CLASSIFIER_DIR: &str = "checkpoints/bats/v1.0";
    /// Directory holding translated label files.
    pub const TRANSLATED_LABELS_DIR: &str = "labels/V2.4";
    /// Label file of the built-in global bird model.
    pub const BIRD_LABELS_FILE: &str = "checkpoints/V2.4/BirdNET_GLOBAL_6K_V2.4_Labels.txt";
    /// Upload storage directory of the server.
    pub const UPLOAD_DIR: &str = "uploads/";
}

/// Server defaults.
pub mod server {
    /// Default bind host.
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    /// Default bind port.
    pub const DEFAULT_PORT: u16 = 7667;
    /// Default region for the server.
    pub const DEFAULT_AREA: &str = "Bavaria";
    /// Default upload body limit in bytes.
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;
}

/// Header names of the analyzer CSV output.
pub mod csv_columns {
    /// Segment start column.
    pub const START: &str = "Start (s)";
    /// Segment end column.
    pub const END: &str = "End (s)";
    /// Scientific name column.
    pub const SCIENTIFIC_NAME: &str = "Scientific name";
    /// Common name column.
    pub const COMMON_NAME: &str = "Common name";
    /// Confidence column.
    pub const CONFIDENCE: &str = "Confidence";
}
