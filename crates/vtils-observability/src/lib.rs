// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # vtils-observability
//!
//! Logging initialisation shared by the vtils binaries (producer demos and the
//! viewer process), with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: daily-rolling log files under a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known vtils crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "vtils",
    "vtils-config",
    "vtils-shm",
    "vtils-srv",
];
