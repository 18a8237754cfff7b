//! Label and species list file reading.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Source of line-oriented label files.
pub trait LabelSource: Send + Sync {
    /// Read all non-blank lines of `path`, trimmed, in file order.
    fn load_lines(&self, path: &Path) -> Result<Vec<String>>;

    /// Whether `path` names a readable label file.
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Label source backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLabels;

impl LabelSource for FileLabels {
    fn load_lines(&self, path: &Path) -> Result<Vec<String>> {
        read_lines(path)
    }
}

/// Read a label or species list file.
///
/// # File Format
/// - One entry per line, e.g. `Myotis myotis_Greater Mouse-eared Bat`
/// - Blank lines are ignored, surrounding whitespace is trimmed
///
/// # Errors
/// - Returns error if file cannot be read
/// - Returns error if file contains invalid UTF-8
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::LabelsRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::LabelsRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    Ok(lines)
}
