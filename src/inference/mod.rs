//! Interfaces to the classifier, species filter and label files.
//!
//! Inference itself happens outside this crate. The traits here are the
//! seams the orchestration layer calls through; [`ExternalAnalyzer`] is the
//! production implementation backed by child processes.

mod external;
mod labels;

pub use external::ExternalAnalyzer;
pub use labels::{FileLabels, LabelSource, read_lines};

use crate::config::{Location, RunConfiguration};
use crate::error::Result;
use crate::output::PredictionSegment;
use std::path::Path;

/// Classifies one audio file into ordered prediction segments.
pub trait Classifier: Send + Sync {
    /// Classify `path` with the given run configuration.
    fn classify(&self, path: &Path, config: &RunConfiguration) -> Result<Vec<PredictionSegment>>;
}

/// Produces the species expected at a location and week.
pub trait SpeciesFilter: Send + Sync {
    /// Species whose occurrence probability reaches `threshold`.
    ///
    /// A `week` of `None` asks for the year-round list.
    fn filter_species(
        &self,
        location: Location,
        week: Option<u8>,
        threshold: f32,
    ) -> Result<Vec<String>>;
}
