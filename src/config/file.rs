//! Configuration file location, loading and saving.

use crate::config::{Config, validate_config};
use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/battyd/`
/// - macOS: `~/Library/Application Support/battyd/`
/// - Windows: `%APPDATA%\battyd\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load and validate configuration from a TOML file.
///
/// A missing file yields the default configuration.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from an explicit path, or from the platform default.
///
/// Without an explicit path, an undeterminable config directory falls back
/// to the default configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config_file(path),
        None => config_file_path().map_or_else(|_| Ok(Config::default()), |p| load_config_file(&p)),
    }
}

/// Save configuration to a TOML file, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    std::fs::write(path, contents).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_nonexistent_file_returns_default() {
        let path = Path::new("/nonexistent/path/config.toml");
        let config = load_config_file(path);
        assert!(config.is_ok());
        let config = config.ok().unwrap();
        assert!(config.analyzer.classify_command.is_empty());
        assert_eq!(config.server.port, 7667);
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[defaults]
min_confidence = 0.25
region = "UK"

[server]
port = 8080
no_noise = true

[analyzer]
classify_command = ["python3", "bat_ident.py"]
"#
        )
        .unwrap();

        let config = load_config_file(file.path());
        assert!(config.is_ok());
        let config = config.ok().unwrap();
        assert_eq!(config.defaults.min_confidence, 0.25);
        assert_eq!(config.defaults.region.as_deref(), Some("UK"));
        assert_eq!(config.server.port, 8080);
        assert!(config.server.no_noise);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.analyzer.classify_command,
            vec!["python3".to_string(), "bat_ident.py".to_string()]
        );
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let config = load_config_file(file.path());
        assert!(config.is_err());
    }

    #[test]
    fn test_load_out_of_range_values_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\nsensitivity = 3.0").unwrap();

        let config = load_config_file(file.path());
        assert!(matches!(config, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_config_file_path_ends_with_toml() {
        // Headless environments may have no home directory at all.
        if let Ok(path) = config_file_path() {
            assert!(path.to_string_lossy().ends_with("config.toml"));
            assert!(path.to_string_lossy().contains("battyd"));
        }
    }

    #[test]
    fn test_save_then_load_preserves_server_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.area = "USA-EAST".to_string();
        config.server.threads = 8;
        save_config(&config, &path).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.server.area, "USA-EAST");
        assert_eq!(loaded.server.threads, 8);
    }
}
