//! Per-run analysis configuration.

use crate::config::{Region, ResultFormat, SignalProfile};
use crate::error::Result;
use crate::inference::SpeciesFilter;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Recording location used for the species filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// How input files are spread over workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One file: a single worker with multi-threaded inference.
    SingleFile {
        /// Requested thread count.
        threads: usize,
    },
    /// A directory of files: parallel workers, single-threaded inference each.
    Directory {
        /// Requested thread count.
        threads: usize,
    },
}

impl RunMode {
    /// Split the requested threads into `(cpu_workers, inference_threads)`.
    ///
    /// Only one side ever exceeds 1, so the two levels never multiply.
    pub fn concurrency(self) -> (usize, usize) {
        match self {
            Self::SingleFile { threads } => (1, threads.max(1)),
            Self::Directory { threads } => (threads.max(1), 1),
        }
    }
}

/// Fully resolved configuration for one analysis run.
///
/// Built fresh per run (or per server request) and shared read-only with the
/// workers afterwards.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Region preset the configuration was resolved from.
    pub region: Region,
    /// Custom classifier model; `None` selects the built-in model.
    pub classifier: Option<PathBuf>,
    /// Label set file.
    pub labels_path: PathBuf,
    /// Label set, one species per entry.
    pub labels: Arc<[String]>,
    /// Translated label file, when one was loaded.
    pub translated_labels_path: Option<PathBuf>,
    /// Translated labels (the base labels when no translation applies).
    pub translated_labels: Arc<[String]>,
    /// Effective locale.
    pub locale: String,
    /// Recording location; `None` disables geofencing.
    pub location: Option<Location>,
    /// Week of the year (1-48); `None` means year-round.
    pub week: Option<u8>,
    /// Occurrence threshold for the species filter.
    pub species_filter_threshold: f32,
    /// Allowed species; empty means the full label set.
    pub species_list: Vec<String>,
    /// Minimum confidence of reported segments.
    pub min_confidence: f32,
    /// Sigmoid sensitivity.
    pub sensitivity: f32,
    /// Segment overlap in seconds.
    pub overlap: f32,
    /// Inference batch size.
    pub batch_size: usize,
    /// File-level worker count.
    pub cpu_workers: usize,
    /// Threads used by a single inference call.
    pub inference_threads: usize,
    /// Result file format.
    pub result_format: ResultFormat,
    /// Audio framing of the model.
    pub signal: SignalProfile,
}

impl RunConfiguration {
    /// Number of species the run can report.
    pub fn species_count(&self) -> usize {
        if self.species_list.is_empty() {
            self.labels.len()
        } else {
            self.species_list.len()
        }
    }

    /// Narrow the species list for the configured location.
    ///
    /// Without a location the species list is cleared and the full label set
    /// applies.
    pub fn narrow_species(&mut self, filter: &dyn SpeciesFilter) -> Result<()> {
        self.species_list = match self.location {
            Some(location) => filter.filter_species(
                location,
                self.week,
                self.species_filter_threshold,
            )?,
            None => Vec::new(),
        };
        self.log_species_count();
        Ok(())
    }

    /// Log how many species the run covers.
    pub fn log_species_count(&self) {
        let count = self.species_count();
        if count == 0 {
            warn!(
                "Species list and label set are both empty; no species can be reported (labels: {})",
                self.labels_path.display()
            );
        } else {
            info!("Species list contains {count} species");
        }
    }
}
