// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Viewer process: attaches to a buffer group by name and redraws it on a
//! timer until the producer raises the shutdown word.

pub mod frame;
#[cfg(feature = "gui")]
pub mod gui;
pub mod headless;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use vtils_config::validation::REFRESH_INTERVAL_RANGE_MS;
use vtils_config::VtilsConfig;
use vtils_shm::RegionDir;

pub use frame::{finite_segments, plot_bounds, Frame, FrameSource, SeriesFrame, SeriesSpec};
pub use headless::{run_headless, HeadlessReport};

use crate::options::DEFAULT_WINDOW_TITLE;

/// Live plot of a shared-memory series buffer
#[derive(Parser, Debug, Clone)]
#[command(name = "srv-viewer", version, long_about = None)]
pub struct ViewerArgs {
    /// Buffer group to attach to
    #[arg(long)]
    pub group: String,

    /// Region directory (defaults to the configured or platform directory)
    #[arg(long)]
    pub region_dir: Option<PathBuf>,

    /// Series in legend order, `name` or `name=#rrggbb` (repeatable)
    #[arg(long = "series")]
    pub series: Vec<SeriesSpec>,

    /// Window title
    #[arg(long, default_value = DEFAULT_WINDOW_TITLE)]
    pub title: String,

    /// Title drawn above the plot
    #[arg(long)]
    pub plot_title: Option<String>,

    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    #[arg(long)]
    pub x_label: Option<String>,

    #[arg(long)]
    pub y_label: Option<String>,

    /// Fixed x range, `lo,hi`
    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    pub x_limits: Option<(f64, f64)>,

    /// Fixed y range, `lo,hi`
    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    pub y_limits: Option<(f64, f64)>,

    /// Redraw interval in milliseconds
    #[arg(
        long,
        default_value_t = 50,
        value_parser = clap::value_parser!(u64)
            .range(REFRESH_INTERVAL_RANGE_MS.0..=REFRESH_INTERVAL_RANGE_MS.1)
    )]
    pub refresh_ms: u64,

    /// Poll without opening a window
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Headless only: stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,
}

/// Parse `lo,hi` with `lo < hi`.
pub fn parse_limits(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lo,hi, got '{}'", s))?;
    let lo: f64 = lo.trim().parse().map_err(|e| format!("bad lower limit: {}", e))?;
    let hi: f64 = hi.trim().parse().map_err(|e| format!("bad upper limit: {}", e))?;
    if !(lo < hi) {
        return Err(format!("lower limit {} must be below upper limit {}", lo, hi));
    }
    Ok((lo, hi))
}

/// Attach and draw until shutdown.
pub fn run(args: ViewerArgs, config: &VtilsConfig) -> anyhow::Result<()> {
    let dir = match &args.region_dir {
        Some(dir) => RegionDir::new(dir),
        None => RegionDir::from_config(&config.shm),
    };
    let source = FrameSource::attach(&dir, &args.group, &args.series)
        .with_context(|| format!("Failed to attach to series group '{}'", args.group))?;

    let headless = args.headless || config.viewer.headless;
    if !headless {
        #[cfg(feature = "gui")]
        return gui::run_window(source, &args);

        #[cfg(not(feature = "gui"))]
        tracing::warn!("Built without the `gui` feature; running headless");
    }

    run_headless(
        &source,
        Duration::from_millis(args.refresh_ms),
        args.max_frames,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limits() {
        assert_eq!(parse_limits("-1,100").unwrap(), (-1.0, 100.0));
        assert_eq!(parse_limits(" -2.5 , 3 ").unwrap(), (-2.5, 3.0));
        assert!(parse_limits("3,3").is_err());
        assert!(parse_limits("1").is_err());
        assert!(parse_limits("a,b").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = ViewerArgs::try_parse_from([
            "srv-viewer",
            "--group",
            "g",
            "--series",
            "a=#ff0000",
            "--series",
            "b",
            "--y-limits=-2,3",
            "--headless",
        ])
        .unwrap();
        assert_eq!(args.group, "g");
        assert_eq!(args.series.len(), 2);
        assert_eq!(args.y_limits, Some((-2.0, 3.0)));
        assert_eq!(args.refresh_ms, 50);
        assert_eq!(args.title, "Simple Remote Viz");
        assert!(args.headless);
    }

    #[test]
    fn test_refresh_range_enforced() {
        let result = ViewerArgs::try_parse_from(["srv-viewer", "--group", "g", "--refresh-ms", "0"]);
        assert!(result.is_err());
    }
}
