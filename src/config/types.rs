//! Configuration type definitions.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MIN_CONFIDENCE, DEFAULT_OVERLAP, DEFAULT_SENSITIVITY,
    DEFAULT_THREADS, paths, server, species_filter,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default analysis settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Model and label locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External analyzer command lines.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Default analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default region for desktop analysis runs.
    pub region: Option<String>,

    /// Locale for translated common names.
    pub locale: String,

    /// Minimum confidence threshold.
    pub min_confidence: f32,

    /// Detection sensitivity.
    pub sensitivity: f32,

    /// Segment overlap in seconds.
    pub overlap: f32,

    /// Batch size for inference.
    pub batch_size: usize,

    /// Thread count for analysis runs.
    pub threads: usize,

    /// Occurrence threshold for the location species filter.
    pub species_filter_threshold: f32,

    /// Result file format handed to the classifier.
    pub result_format: ResultFormat,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            region: None,
            locale: crate::constants::BASE_LOCALE.to_string(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            sensitivity: DEFAULT_SENSITIVITY,
            overlap: DEFAULT_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
            threads: DEFAULT_THREADS,
            species_filter_threshold: species_filter::DEFAULT_THRESHOLD,
            result_format: ResultFormat::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host name or address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Directory where persisted uploads are stored.
    pub storage_path: PathBuf,

    /// Inference thread count.
    pub threads: usize,

    /// Locale for translated common names.
    pub locale: String,

    /// Region preset.
    pub area: String,

    /// Use the high-accuracy model variant where available.
    pub no_noise: bool,

    /// Directory for temporary uploads (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,

    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            storage_path: PathBuf::from(paths::UPLOAD_DIR),
            threads: DEFAULT_THREADS,
            locale: crate::constants::BASE_LOCALE.to_string(),
            area: server::DEFAULT_AREA.to_string(),
            no_noise: false,
            temp_dir: None,
            max_upload_bytes: server::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Model and label locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding classifier models and their label files.
    pub classifier_dir: PathBuf,

    /// Directory holding translated label files.
    pub translated_labels_dir: PathBuf,

    /// Label file of the built-in global bird model.
    pub bird_labels: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            classifier_dir: PathBuf::from(paths::CLASSIFIER_DIR),
            translated_labels_dir: PathBuf::from(paths::TRANSLATED_LABELS_DIR),
            bird_labels: PathBuf::from(paths::BIRD_LABELS_FILE),
        }
    }
}

/// External analyzer command lines.
///
/// Each command is an argv prefix; per-call flags are appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Command that classifies one audio file.
    pub classify_command: Vec<String>,

    /// Command that produces a location species list.
    pub species_command: Vec<String>,
}

/// Result file formats understood by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// Raven selection table.
    #[default]
    Table,
    /// Audacity labels.
    Audacity,
    /// R-compatible CSV.
    R,
    /// Generic CSV.
    Csv,
}

impl ResultFormat {
    /// Parse a format name, falling back to [`ResultFormat::Table`] for unknown names.
    ///
    /// Accepts both the short names and the display names used by the desktop
    /// front end ("Raven selection table", "Audacity", "R", "CSV").
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "audacity" => Self::Audacity,
            "r" => Self::R,
            "csv" => Self::Csv,
            _ => Self::Table,
        }
    }
}

impl std::fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Audacity => write!(f, "audacity"),
            Self::R => write!(f, "r"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for ResultFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}
