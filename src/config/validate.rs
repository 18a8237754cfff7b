//! Configuration validation.

use crate::config::Config;
use crate::constants::{confidence, overlap, sensitivity};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    validate_server(config)?;
    Ok(())
}

/// Validate default settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if !(confidence::MIN..=confidence::MAX).contains(&defaults.min_confidence) {
        return Err(out_of_range(
            "min_confidence",
            confidence::MIN,
            confidence::MAX,
            defaults.min_confidence,
        ));
    }

    if !(sensitivity::MIN..=sensitivity::MAX).contains(&defaults.sensitivity) {
        return Err(out_of_range(
            "sensitivity",
            sensitivity::MIN,
            sensitivity::MAX,
            defaults.sensitivity,
        ));
    }

    if !(overlap::MIN..=overlap::DESKTOP_MAX).contains(&defaults.overlap) {
        return Err(out_of_range(
            "overlap",
            overlap::MIN,
            overlap::DESKTOP_MAX,
            defaults.overlap,
        ));
    }

    if !(0.0..=1.0).contains(&defaults.species_filter_threshold) {
        return Err(out_of_range(
            "species_filter_threshold",
            0.0,
            1.0,
            defaults.species_filter_threshold,
        ));
    }

    if defaults.batch_size == 0 {
        return Err(Error::ConfigValidation {
            message: "batch_size must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Validate server settings.
fn validate_server(config: &Config) -> Result<()> {
    if config.server.host.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.server.max_upload_bytes == 0 {
        return Err(Error::ConfigValidation {
            message: "server.max_upload_bytes must be at least 1".to_string(),
        });
    }

    Ok(())
}

fn out_of_range(name: &str, min: f32, max: f32, value: f32) -> Error {
    Error::ConfigValidation {
        message: format!("{name} must be between {min} and {max}, got {value}"),
    }
}
