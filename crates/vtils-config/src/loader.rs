// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, VtilsConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "vtils.toml";

/// Find the vtils configuration file
///
/// Search order:
/// 1. `VTILS_CONFIG_PATH` environment variable
/// 2. Current working directory: `./vtils.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("VTILS_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by VTILS_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet VTILS_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<VtilsConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: VtilsConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults
/// (still subject to environment and CLI overrides).
///
/// An explicitly given `config_path` that does not exist is still an error.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<VtilsConfig> {
    match load_config(config_path, cli_args) {
        Err(ConfigError::FileNotFound(_)) if config_path.is_none() => {
            let mut config = VtilsConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        other => other,
    }
}

fn parse_bool(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `VTILS_SHM_DIR` -> `shm.dir`
/// - `VTILS_VIEWER_PROGRAM` -> `viewer.program`
/// - `VTILS_REFRESH_MS` -> `viewer.refresh_interval_ms`
/// - `VTILS_HEADLESS` -> `viewer.headless`
/// - `VTILS_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut VtilsConfig) {
    if let Ok(value) = env::var("VTILS_SHM_DIR") {
        config.shm.dir = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var("VTILS_VIEWER_PROGRAM") {
        config.viewer.program = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var("VTILS_REFRESH_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.viewer.refresh_interval_ms = ms;
        }
    }
    if let Ok(value) = env::var("VTILS_HEADLESS") {
        config.viewer.headless = parse_bool(&value);
    }
    if let Ok(value) = env::var("VTILS_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"shm_dir": "/tmp/regions", "refresh_ms": "20"}`)
pub fn apply_cli_overrides(config: &mut VtilsConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("shm_dir") {
        config.shm.dir = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("viewer_program") {
        config.viewer.program = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("refresh_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.viewer.refresh_interval_ms = ms;
        }
    }
    if let Some(value) = cli_args.get("headless") {
        config.viewer.headless = parse_bool(value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
