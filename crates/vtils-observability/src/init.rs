// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for vtils
//!
//! Console output is always installed. With the `file-logging` feature and a
//! log directory, a daily-rolling file is added under a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── vtils.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Logging initialization result
///
/// Keep it alive for the lifetime of the process; file writers flush on drop.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the filter: `RUST_LOG` wins when set, otherwise the debug flags over `default_level`.
pub fn build_env_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug_flags.to_filter_string(default_level)))
}

/// Initialize logging with console output and, optionally, file output
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `default_level` - Level for everything not named by a debug flag
/// * `log_dir` - Base directory for log files (only used with `file-logging`)
///
/// # Errors
/// Fails if a global subscriber is already installed or the log folder cannot be created.
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    default_level: &str,
    log_dir: Option<PathBuf>,
) -> Result<LoggingGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(build_env_filter(debug_flags, default_level))
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, run_folder) = {
        let mut guards = Vec::new();
        let mut run_folder = None;
        if let Some(base_log_dir) = log_dir {
            use anyhow::Context;

            let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
            let folder = base_log_dir.join(format!("run_{}", timestamp));
            std::fs::create_dir_all(&folder)
                .with_context(|| format!("Failed to create log directory: {}", folder.display()))?;
            cleanup_old_runs(&base_log_dir, DEFAULT_RETENTION_RUNS)?;

            let appender = tracing_appender::rolling::daily(&folder, "vtils.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(build_env_filter(debug_flags, default_level))
                .boxed();
            layers.push(file_layer);
            run_folder = Some(folder);
        }
        (guards, run_folder)
    };

    #[cfg(not(feature = "file-logging"))]
    let run_folder = {
        if log_dir.is_some() {
            eprintln!("vtils: log_dir ignored, built without the `file-logging` feature");
        }
        None
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Initialize console logging at `info` with the given debug flags
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, "info", None)
}

/// Number of run folders kept by [`cleanup_old_runs`] during init
pub const DEFAULT_RETENTION_RUNS: usize = 10;

/// Remove all but the `keep` most recent `run_YYYYmmdd_HHMMSS` folders.
///
/// Returns the number of folders removed.
pub fn cleanup_old_runs(base_log_dir: &Path, keep: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, chrono::NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .and_then(|s| chrono::NaiveDateTime::parse_from_str(s, "%Y%m%d_%H%M%S").ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, stamp)| *stamp);

    let mut removed = 0;
    if runs.len() > keep {
        let excess = runs.len() - keep;
        for (path, _) in runs.iter().take(excess) {
            match std::fs::remove_dir_all(path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_most_recent_runs() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in ["20240101_000000", "20240102_000000", "20240103_000000"] {
            std::fs::create_dir(dir.path().join(format!("run_{}", stamp))).unwrap();
        }
        std::fs::create_dir(dir.path().join("not_a_run")).unwrap();

        let removed = cleanup_old_runs(dir.path(), 2).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20240101_000000").exists());
        assert!(dir.path().join("run_20240103_000000").exists());
        assert!(dir.path().join("not_a_run").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_runs(&dir.path().join("absent"), 1).unwrap(), 0);
    }
}
