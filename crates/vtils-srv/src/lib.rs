// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # vtils-srv (Simple Remote Viz)
//!
//! Live plotting for timing-critical producers. The producer appends samples
//! into a [`CircularSeriesBuffer`] held in named shared memory regions; a
//! separate `srv-viewer` process attaches to the same regions and redraws
//! them on a timer. Appending never blocks on rendering.
//!
//! ```rust,no_run
//! use vtils_srv::{CircularSeriesBuffer, SrvOptions};
//!
//! let mut srv = CircularSeriesBuffer::new(
//!     SrvOptions::default()
//!         .with_capacity(1000)
//!         .with_plot_title("Demo plot")
//!         .with_y_limits(-2.0, 3.0),
//! )?;
//! for i in 0..10_000 {
//!     let t = i as f64 * 0.01;
//!     srv.append(t, (2.0 * std::f64::consts::PI * t).sin())?;
//! }
//! srv.close()?;
//! # Ok::<(), vtils_srv::SrvError>(())
//! ```
//!
//! Frames are best-effort: the viewer may observe a write in progress. Each
//! mutation bumps a generation counter in the group's control region so the
//! viewer can detect and retry torn frames; consumers needing exact
//! consistency must use that counter.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod buffer;
pub mod control;
pub mod dict_plot;
pub mod error;
pub mod launcher;
pub mod options;
pub mod viewer;

pub use buffer::{generate_group_name, CircularSeriesBuffer, Fill, SeriesSnapshot};
pub use dict_plot::DictPlot;
pub use error::{SrvError, SrvResult};
pub use launcher::{resolve_viewer_program, ViewerProcess};
pub use options::{Color, LaunchMode, SrvOptions, DEFAULT_PALETTE};
