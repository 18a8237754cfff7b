//! Result rendering for the command line.

use crate::config::{ResultFormat, RunConfiguration};
use crate::constants::{confidence::DECIMAL_PLACES, csv_columns};
use crate::error::{Error, Result};
use crate::output::{PredictionSegment, SpeciesScore};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Per-file entry of the `--json` report.
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    /// Analyzed file.
    pub file: &'a Path,
    /// Failure reason, when the file could not be analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    /// Segments above the confidence threshold.
    pub results: &'a [PredictionSegment],
    /// Pooled top species.
    pub summary: Vec<SpeciesScore>,
}

/// Writes analysis results in one of the result formats.
///
/// One writer covers a whole run; the header (if the format has one) is
/// written before the first file.
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
    format: ResultFormat,
    selection: usize,
    header_written: bool,
}

impl<W: Write> ResultWriter<W> {
    /// Create a writer for `format`.
    pub fn new(out: W, format: ResultFormat) -> Self {
        let delimiter = match format {
            ResultFormat::Table | ResultFormat::Audacity => b'\t',
            ResultFormat::R | ResultFormat::Csv => b',',
        };
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_writer(out);

        Self {
            writer,
            format,
            selection: 0,
            header_written: false,
        }
    }

    /// Write all segments of one file.
    pub fn write_file(
        &mut self,
        path: &Path,
        segments: &[PredictionSegment],
        config: &RunConfiguration,
    ) -> Result<()> {
        if !self.header_written {
            self.write_header()?;
            self.header_written = true;
        }

        let file = path.display().to_string();
        for segment in segments {
            let start = format!("{:.1}", segment.start_seconds);
            let end = format!("{:.1}", segment.end_seconds);
            let confidence = format!("{:.decimal$}", segment.confidence, decimal = DECIMAL_PLACES);

            let record: Vec<String> = match self.format {
                ResultFormat::Table => {
                    self.selection += 1;
                    vec![
                        self.selection.to_string(),
                        "Spectrogram 1".to_string(),
                        "1".to_string(),
                        start,
                        end,
                        "0".to_string(),
                        (config.signal.sample_rate / 2).to_string(),
                        segment.scientific_name.clone(),
                        segment.common_name.clone(),
                        confidence,
                        file.clone(),
                    ]
                }
                ResultFormat::Audacity => vec![
                    start,
                    end,
                    format!("{}, {}", segment.scientific_name, segment.common_name),
                    confidence,
                ],
                ResultFormat::R => vec![
                    file.clone(),
                    start,
                    end,
                    segment.scientific_name.clone(),
                    segment.common_name.clone(),
                    confidence,
                    config
                        .location
                        .map_or_else(|| "-1".to_string(), |l| l.latitude.to_string()),
                    config
                        .location
                        .map_or_else(|| "-1".to_string(), |l| l.longitude.to_string()),
                    config.week.map_or_else(|| "-1".to_string(), |w| w.to_string()),
                    config.overlap.to_string(),
                    config.sensitivity.to_string(),
                    config.min_confidence.to_string(),
                ],
                ResultFormat::Csv => vec![
                    start,
                    end,
                    segment.scientific_name.clone(),
                    segment.common_name.clone(),
                    confidence,
                    file.clone(),
                ],
            };

            self.writer
                .write_record(&record)
                .map_err(|source| Error::ResultWrite { source })?;
        }
        Ok(())
    }

    /// Flush buffered output.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        let header: &[&str] = match self.format {
            ResultFormat::Table => &[
                "Selection",
                "View",
                "Channel",
                "Begin Time (s)",
                "End Time (s)",
                "Low Freq (Hz)",
                "High Freq (Hz)",
                "Scientific Name",
                "Common Name",
                "Confidence",
                "Begin Path",
            ],
            ResultFormat::Audacity => return Ok(()),
            ResultFormat::R => &[
                "filepath",
                "start",
                "end",
                "scientific_name",
                "common_name",
                "confidence",
                "lat",
                "lon",
                "week",
                "overlap",
                "sensitivity",
                "min_conf",
            ],
            ResultFormat::Csv => &[
                csv_columns::START,
                csv_columns::END,
                csv_columns::SCIENTIFIC_NAME,
                csv_columns::COMMON_NAME,
                csv_columns::CONFIDENCE,
                "File",
            ],
        };

        self.writer
            .write_record(header)
            .map_err(|source| Error::ResultWrite { source })
    }
}
