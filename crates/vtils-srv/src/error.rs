// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for series buffers and the viewer process

use std::path::PathBuf;

use thiserror::Error;
use vtils_config::ConfigError;
use vtils_shm::ShmError;

/// Result type alias for buffer operations
pub type SrvResult<T> = Result<T, SrvError>;

#[derive(Debug, Error)]
pub enum SrvError {
    /// A series key passed to append/update/clear is not part of the buffer
    #[error("series '{0}' not found")]
    KeyNotFound(String),

    #[error("series '{0}' appears more than once in the legend list")]
    DuplicateSeries(String),

    #[error("a series buffer needs at least one series")]
    NoSeries,

    /// Capacity must leave room for a sample and the wrap sentinel
    #[error("invalid capacity {0}: must be at least 2")]
    InvalidCapacity(usize),

    /// Single-series append on a buffer holding several series
    #[error("append(x, y) is ambiguous on a buffer with {0} series; use append_points or append_values")]
    AmbiguousSeries(usize),

    #[error("series '{series}' expects {expected} values, got {actual}")]
    LengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid series spec '{spec}': {reason}")]
    InvalidSeriesSpec { spec: String, reason: String },

    #[error("failed to launch viewer '{}': {source}", program.display())]
    ViewerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("viewer '{}' exited with {status}", program.display())]
    ViewerFailed { program: PathBuf, status: String },

    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
