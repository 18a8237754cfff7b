//! Classifier and species filter backed by external analyzer commands.
//!
//! The analyzer scripts are configured as argv prefixes; per-call flags are
//! appended. Classification results come back as CSV, species lists as one
//! species per line.

use crate::config::{AnalyzerConfig, Location, RunConfiguration};
use crate::error::{Error, Result};
use crate::inference::{Classifier, SpeciesFilter, read_lines};
use crate::output::PredictionSegment;
use serde::Deserialize;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Internal record for CSV deserialization.
#[derive(Debug, Deserialize)]
struct SegmentRecord {
    #[serde(rename = "Start (s)")]
    start: f32,
    #[serde(rename = "End (s)")]
    end: f32,
    #[serde(rename = "Scientific name")]
    scientific_name: String,
    #[serde(rename = "Common name")]
    common_name: String,
    #[serde(rename = "Confidence")]
    confidence: f32,
}

impl From<SegmentRecord> for PredictionSegment {
    fn from(record: SegmentRecord) -> Self {
        Self {
            start_seconds: record.start,
            end_seconds: record.end,
            scientific_name: record.scientific_name,
            common_name: record.common_name,
            confidence: record.confidence,
        }
    }
}

/// Runs the configured analyzer commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ExternalAnalyzer {
    classify_command: Vec<String>,
    species_command: Vec<String>,
}

impl ExternalAnalyzer {
    /// Create an analyzer from the `[analyzer]` configuration section.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            classify_command: config.classify_command.clone(),
            species_command: config.species_command.clone(),
        }
    }
}

impl Classifier for ExternalAnalyzer {
    fn classify(&self, path: &Path, config: &RunConfiguration) -> Result<Vec<PredictionSegment>> {
        let (program, prefix) = split_command(&self.classify_command, "classify")?;

        let output = tempfile::Builder::new()
            .prefix("battyd-results-")
            .suffix(".csv")
            .tempfile()?;

        let species_file = if config.species_list.is_empty() {
            None
        } else {
            let mut file = tempfile::Builder::new()
                .prefix("battyd-species-")
                .suffix(".txt")
                .tempfile()?;
            for species in &config.species_list {
                writeln!(file, "{species}")?;
            }
            file.flush()?;
            Some(file)
        };

        let args = classify_args(
            path,
            output.path(),
            species_file.as_ref().map(tempfile::NamedTempFile::path),
            config,
        );
        run_command(program, prefix, &args).map_err(|reason| match reason {
            CommandFailure::Spawn(source) => Error::AnalyzerSpawn {
                program: program.to_string(),
                source,
            },
            CommandFailure::Exit(reason) => Error::Analysis {
                path: path.to_path_buf(),
                reason,
            },
        })?;

        parse_segments(output.path())
    }
}

impl SpeciesFilter for ExternalAnalyzer {
    fn filter_species(
        &self,
        location: Location,
        week: Option<u8>,
        threshold: f32,
    ) -> Result<Vec<String>> {
        let (program, prefix) = split_command(&self.species_command, "species")?;
        let output = tempfile::Builder::new()
            .prefix("battyd-species-")
            .suffix(".txt")
            .tempfile()?;

        let args: Vec<OsString> = vec![
            "--o".into(),
            output.path().into(),
            "--lat".into(),
            location.latitude.to_string().into(),
            "--lon".into(),
            location.longitude.to_string().into(),
            "--week".into(),
            week_arg(week).into(),
            "--threshold".into(),
            threshold.to_string().into(),
        ];

        run_command(program, prefix, &args).map_err(|failure| match failure {
            CommandFailure::Spawn(source) => Error::AnalyzerSpawn {
                program: program.to_string(),
                source,
            },
            CommandFailure::Exit(reason) => Error::SpeciesFilter { reason },
        })?;

        read_lines(output.path())
    }
}

enum CommandFailure {
    Spawn(std::io::Error),
    Exit(String),
}

fn split_command<'a>(
    command: &'a [String],
    kind: &'static str,
) -> Result<(&'a str, &'a [String])> {
    command
        .split_first()
        .map(|(program, prefix)| (program.as_str(), prefix))
        .ok_or(Error::AnalyzerNotConfigured { kind })
}

fn run_command(
    program: &str,
    prefix: &[String],
    args: &[OsString],
) -> std::result::Result<(), CommandFailure> {
    debug!("Running {program} {} with {} arguments", prefix.join(" "), args.len());

    let output = Command::new(program)
        .args(prefix)
        .args(args)
        .output()
        .map_err(CommandFailure::Spawn)?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();
    Err(CommandFailure::Exit(if detail.is_empty() {
        format!("analyzer exited with {}", output.status)
    } else {
        format!("analyzer exited with {}: {detail}", output.status)
    }))
}

/// BirdNET-style week argument; `-1` requests the year-round list.
fn week_arg(week: Option<u8>) -> String {
    week.map_or_else(|| "-1".to_string(), |w| w.to_string())
}

/// Build the per-file flags for the classify command.
fn classify_args(
    input: &Path,
    output: &Path,
    species_file: Option<&Path>,
    config: &RunConfiguration,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--i".into(),
        input.into(),
        "--o".into(),
        output.into(),
        "--rtype".into(),
        "csv".into(),
        "--min_conf".into(),
        config.min_confidence.to_string().into(),
        "--sensitivity".into(),
        config.sensitivity.to_string().into(),
        "--overlap".into(),
        config.overlap.to_string().into(),
        "--threads".into(),
        config.inference_threads.to_string().into(),
        "--batchsize".into(),
        config.batch_size.to_string().into(),
        "--locale".into(),
        config.locale.clone().into(),
        "--labels".into(),
        config.labels_path.clone().into(),
        "--sample_rate".into(),
        config.signal.sample_rate.to_string().into(),
        "--sig_length".into(),
        config.signal.segment_length.to_string().into(),
        "--sig_minlen".into(),
        config.signal.min_segment_length.to_string().into(),
    ];

    if let Some(translated) = &config.translated_labels_path {
        args.push("--translated_labels".into());
        args.push(translated.clone().into());
    }

    if let Some(classifier) = &config.classifier {
        args.push("--classifier".into());
        args.push(classifier.clone().into());
    }

    if let Some(species_file) = species_file {
        args.push("--slist".into());
        args.push(species_file.into());
    }

    if let Some(location) = config.location {
        args.push("--lat".into());
        args.push(location.latitude.to_string().into());
        args.push("--lon".into());
        args.push(location.longitude.to_string().into());
    }

    if let Some(week) = config.week {
        args.push("--week".into());
        args.push(week.to_string().into());
    }

    args
}

/// Parse the analyzer's CSV result file.
fn parse_segments(path: &Path) -> Result<Vec<PredictionSegment>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::AnalyzerOutput {
            path: path.to_path_buf(),
            source: e,
        })?;

    reader
        .deserialize::<SegmentRecord>()
        .map(|record| {
            record.map(PredictionSegment::from).map_err(|e| Error::AnalyzerOutput {
                path: path.to_path_buf(),
                source: e,
            })
        })
        .collect()
}
