//! Upload storage.

use crate::constants::AUDIO_EXTENSIONS;
use chrono::Local;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// An upload written to disk.
///
/// Temporary uploads are deleted when dropped.
#[derive(Debug)]
pub enum StoredUpload {
    /// Kept under the storage directory.
    Permanent(PathBuf),
    /// Removed when the request ends.
    Temporary(NamedTempFile),
}

impl StoredUpload {
    /// Location of the stored audio.
    pub fn path(&self) -> &Path {
        match self {
            Self::Permanent(path) => path,
            Self::Temporary(file) => file.path(),
        }
    }

    /// Whether the upload outlives the request.
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Final path component of a client-supplied file name.
///
/// Both `/` and `\` count as separators. Returns `None` for names without a
/// usable component.
pub fn client_file_name(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

/// Lower-cased extension of `name` when it is an accepted audio type.
pub fn supported_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Write `data` either to the dated storage directory or to a temporary file.
///
/// Persisted uploads land in `<storage>/<YYYY-MM-DD>/<lower-cased name>`,
/// overwriting an earlier upload of the same name.
pub fn store_upload(
    data: &[u8],
    file_name: &str,
    extension: &str,
    save: bool,
    storage_dir: &Path,
    temp_dir: Option<&Path>,
) -> io::Result<StoredUpload> {
    if save {
        let dir = storage_dir.join(Local::now().format("%Y-%m-%d").to_string());
        fs::create_dir_all(&dir)?;

        let path = dir.join(file_name.to_lowercase());
        fs::write(&path, data)?;
        debug!("Stored upload at {}", path.display());
        return Ok(StoredUpload::Permanent(path));
    }

    let suffix = format!(".{extension}");
    let mut builder = tempfile::Builder::new();
    builder.prefix("battyd-upload-").suffix(&suffix);
    let mut file = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    // A failed write drops `file`, which removes it.
    file.write_all(data)?;
    file.flush()?;
    debug!("Stored upload at {}", file.path().display());
    Ok(StoredUpload::Temporary(file))
}
