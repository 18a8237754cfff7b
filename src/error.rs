//! Error types for battyd.

/// Result type alias for battyd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for battyd.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Region name is not registered.
    #[error("unknown location option: '{name}'")]
    UnknownRegion {
        /// The rejected region name.
        name: String,
    },

    /// Failed to read a label file.
    #[error("failed to read label file '{path}'")]
    LabelsRead {
        /// Path to the label file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Batch was started without input files.
    #[error("no audio files found")]
    NoInputFiles,

    /// Worker pool could not be started.
    #[error("failed to start worker pool: {reason}")]
    WorkerPool {
        /// Description of the failure.
        reason: String,
    },

    /// Classification of a single file failed.
    #[error("analysis of '{path}' failed: {reason}")]
    Analysis {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// External analyzer command could not be started.
    #[error("failed to run analyzer command '{program}'")]
    AnalyzerSpawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// External analyzer produced unreadable output.
    #[error("failed to read analyzer output '{path}'")]
    AnalyzerOutput {
        /// Path to the output file.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// No analyzer command is configured.
    #[error("no {kind} command configured (set [analyzer] in the config file)")]
    AnalyzerNotConfigured {
        /// Which command is missing.
        kind: &'static str,
    },

    /// Species filter lookup failed.
    #[error("species filter failed: {reason}")]
    SpeciesFilter {
        /// Description of the failure.
        reason: String,
    },

    /// Server could not bind its listening socket.
    #[error("failed to bind server to '{addr}'")]
    ServerBind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize results.
    #[error("failed to serialize results")]
    ResultSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write a result table.
    #[error("failed to write results")]
    ResultWrite {
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}
