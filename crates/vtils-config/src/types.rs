// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `vtils.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VtilsConfig {
    pub shm: ShmConfig,
    pub viewer: ViewerConfig,
    pub logging: LoggingConfig,
}

/// Shared memory configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ShmConfig {
    /// Directory holding named regions. Empty = platform default.
    pub dir: Option<PathBuf>,
}

impl ShmConfig {
    /// Resolve the region directory, falling back to the platform default.
    pub fn region_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_region_dir)
    }
}

/// Platform default directory for named regions.
///
/// `/dev/shm` is tmpfs-backed on Linux; elsewhere the system temp dir is used.
pub fn default_region_dir() -> PathBuf {
    let dev_shm = PathBuf::from("/dev/shm");
    if cfg!(target_os = "linux") && dev_shm.is_dir() {
        dev_shm
    } else {
        std::env::temp_dir()
    }
}

/// Viewer (rendering process) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Viewer executable. `None` = `srv-viewer` next to the current executable, then `PATH`.
    pub program: Option<PathBuf>,
    pub refresh_interval_ms: u64,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Run the viewer without opening a window
    pub headless: bool,
    /// Grace period for the viewer to exit after shutdown when a buffer is dropped unclosed
    pub shutdown_grace_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            program: None,
            refresh_interval_ms: 50,
            window_title: "Simple Remote Viz".to_string(),
            window_width: 1000,
            window_height: 600,
            headless: false,
            shutdown_grace_ms: 2000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
