// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # vtils Configuration System
//!
//! Type-safe configuration loader for vtils with support for:
//! - TOML file parsing (`vtils.toml`)
//! - Environment variable overrides (`VTILS_*`)
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vtils_config::load_config_or_default;
//!
//! let config = load_config_or_default(None, None).expect("Failed to load config");
//! println!("Region dir: {}", config.shm.region_dir().display());
//! println!("Refresh: {} ms", config.viewer.refresh_interval_ms);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    load_config_or_default, CONFIG_FILE_NAME,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VtilsConfig::default();
        assert!(validate_config(&config).is_ok());
    }
}
