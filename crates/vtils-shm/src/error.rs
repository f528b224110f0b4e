// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for shared memory regions

use thiserror::Error;

/// Result type alias for region operations
pub type ShmResult<T> = Result<T, ShmError>;

/// Errors raised by [`crate::NamedRegion`] and [`crate::RegionDir`]
#[derive(Debug, Error)]
pub enum ShmError {
    /// A region with this name is already allocated
    #[error("shared memory region '{0}' already exists")]
    AlreadyExists(String),

    /// No region with this name exists
    #[error("shared memory region '{0}' not found")]
    NotFound(String),

    /// The caller's expected element type or shape disagrees with the header
    #[error("shared memory region '{name}' shape mismatch: expected {expected}, found {actual}")]
    ShapeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Name is empty, too long, or contains characters outside `[A-Za-z0-9._-]`
    #[error("invalid region name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Shape has no dimensions, too many dimensions, a zero dimension, or overflows
    #[error("invalid region shape {shape:?}: {reason}")]
    InvalidShape {
        shape: Vec<usize>,
        reason: &'static str,
    },

    /// Backing object exists but does not carry a valid region header
    #[error("shared memory region '{name}' has an invalid header: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The view was closed; its memory is no longer mapped in this process
    #[error("shared memory region '{0}' is closed in this process")]
    Closed(String),

    #[error("index {index} out of bounds for region of {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A consistent snapshot could not be taken because the writer kept writing
    #[error("torn read on region '{name}' after {attempts} attempts")]
    TornRead { name: String, attempts: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
