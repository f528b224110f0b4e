// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are within valid ranges before a viewer is
//! launched with them.

use crate::{ConfigError, ConfigResult, VtilsConfig};

/// Bounds for `viewer.refresh_interval_ms`
pub const REFRESH_INTERVAL_RANGE_MS: (u64, u64) = (1, 10_000);

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    OutOfRange { field: String, value: u64, min: u64, max: u64 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside valid range ({}-{})", field, value, min, max)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// All problems are collected and reported together.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &VtilsConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_viewer(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_viewer(config: &VtilsConfig, errors: &mut Vec<ConfigValidationError>) {
    let (min, max) = REFRESH_INTERVAL_RANGE_MS;
    let refresh = config.viewer.refresh_interval_ms;
    if refresh < min || refresh > max {
        errors.push(ConfigValidationError::OutOfRange {
            field: "viewer.refresh_interval_ms".to_string(),
            value: refresh,
            min,
            max,
        });
    }

    if config.viewer.window_width == 0 || config.viewer.window_height == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "viewer.window_width/window_height".to_string(),
            reason: "window dimensions must be non-zero".to_string(),
        });
    }
}

fn validate_logging(config: &VtilsConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {:?}", config.logging.level, LOG_LEVELS),
        });
    }
}
