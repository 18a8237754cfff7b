//! Test fixtures shared by unit tests.

use crate::config::{Location, Region, ResultFormat, RunConfiguration, SignalProfile};
use crate::error::{Error, Result};
use crate::inference::{Classifier, SpeciesFilter};
use crate::output::PredictionSegment;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A small, fully populated run configuration.
pub fn sample_configuration() -> RunConfiguration {
    let labels: Arc<[String]> = vec!["Myotis myotis_Greater Mouse-eared Bat".to_string()].into();

    RunConfiguration {
        region: Region::Bavaria,
        classifier: Some(PathBuf::from("model.tflite")),
        labels_path: PathBuf::from("labels.txt"),
        translated_labels: Arc::clone(&labels),
        labels,
        translated_labels_path: None,
        locale: "en".to_string(),
        location: None,
        week: None,
        species_filter_threshold: 0.03,
        species_list: Vec::new(),
        min_confidence: 0.1,
        sensitivity: 1.0,
        overlap: 0.0,
        batch_size: 1,
        cpu_workers: 1,
        inference_threads: 4,
        result_format: ResultFormat::Table,
        signal: SignalProfile {
            sample_rate: 256_000,
            segment_length: 1.0,
            min_segment_length: 1.0 / 3.0,
        },
    }
}

/// Deterministic classifier: two segments named after the file.
pub struct StubClassifier;

impl Classifier for StubClassifier {
    fn classify(&self, path: &Path, _config: &RunConfiguration) -> Result<Vec<PredictionSegment>> {
        let stem = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        Ok(vec![
            PredictionSegment::from_label(&format!("Myotis myotis_{stem}"), 0.9, 0.0, 1.0),
            PredictionSegment::from_label(&format!("Nyctalus noctula_{stem}"), 0.4, 1.0, 2.0),
        ])
    }
}

/// Fails (or panics) for paths containing `pattern`, succeeds otherwise.
pub struct FailingClassifier {
    pattern: String,
    panics: bool,
}

impl FailingClassifier {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            panics: false,
        }
    }

    pub fn panicking(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            panics: true,
        }
    }
}

impl Classifier for FailingClassifier {
    fn classify(&self, path: &Path, config: &RunConfiguration) -> Result<Vec<PredictionSegment>> {
        if !path.to_string_lossy().contains(&self.pattern) {
            return StubClassifier.classify(path, config);
        }
        assert!(!self.panics, "classifier blew up on {}", path.display());
        Err(Error::Analysis {
            path: path.to_path_buf(),
            reason: "corrupt audio".to_string(),
        })
    }
}

/// Records the configuration of the last call.
#[derive(Default)]
pub struct RecordingClassifier {
    last: Mutex<Option<RunConfiguration>>,
}

impl RecordingClassifier {
    pub fn last_config(&self) -> Option<RunConfiguration> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Classifier for RecordingClassifier {
    fn classify(&self, path: &Path, config: &RunConfiguration) -> Result<Vec<PredictionSegment>> {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(config.clone());
        }
        StubClassifier.classify(path, config)
    }
}

/// Species filter that always returns one species.
pub struct StubSpeciesFilter;

impl SpeciesFilter for StubSpeciesFilter {
    fn filter_species(
        &self,
        _location: Location,
        _week: Option<u8>,
        _threshold: f32,
    ) -> Result<Vec<String>> {
        Ok(vec!["Myotis myotis".to_string()])
    }
}
