// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Construction options for [`crate::CircularSeriesBuffer`]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vtils_config::validation::REFRESH_INTERVAL_RANGE_MS;
use vtils_config::{validate_config, ConfigError, VtilsConfig};
use vtils_shm::RegionDir;

use crate::error::{SrvError, SrvResult};

pub const DEFAULT_CAPACITY: usize = 500;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_WINDOW_TITLE: &str = "Simple Remote Viz";
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1000, 600);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// 24-bit RGB curve color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Colors assigned to series in legend order when none are configured
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::rgb(0xe6, 0x19, 0x4b), // red
    Color::rgb(0x43, 0x63, 0xd8), // blue
    Color::rgb(0x3c, 0xb4, 0x4b), // green
    Color::rgb(0xf5, 0x82, 0x31), // orange
    Color::rgb(0x91, 0x1e, 0xb4), // purple
    Color::rgb(0x42, 0xd4, 0xf4), // cyan
    Color::rgb(0xf0, 0x32, 0xe6), // magenta
    Color::rgb(0xbf, 0xef, 0x45), // lime
];

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = SrvError;

    /// Parses `#rrggbb` (the `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SrvError::InvalidSeriesSpec {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("color must be #rrggbb"));
        }
        let channel = |at: usize| {
            u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| invalid("bad hex digit"))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// How the viewer process is started when a buffer is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    /// Spawn `srv-viewer` with a window
    #[default]
    Spawn,
    /// Spawn `srv-viewer --headless` (same timer loop, no window)
    Headless,
    /// No child process; an external viewer may attach to the group by name
    Detached,
}

/// Options for a series buffer and its viewer window
#[derive(Debug, Clone)]
pub struct SrvOptions {
    pub capacity: usize,
    /// Series names, in legend order
    pub legends: Vec<String>,
    /// Per-series colors; series beyond this list use [`DEFAULT_PALETTE`]
    pub colors: Vec<Color>,
    pub plot_title: Option<String>,
    pub window_title: String,
    pub window_size: (u32, u32),
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_limits: Option<(f64, f64)>,
    pub y_limits: Option<(f64, f64)>,
    pub refresh_interval: Duration,
    /// Region group name; generated per process when `None`
    pub group_name: Option<String>,
    /// Region directory; platform default when `None`
    pub region_dir: Option<PathBuf>,
    pub launch: LaunchMode,
    /// Viewer executable; resolved next to the current executable when `None`
    pub viewer_program: Option<PathBuf>,
    /// How long a dropped buffer waits for its viewer before killing it
    pub shutdown_grace: Duration,
}

impl Default for SrvOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            legends: vec!["data".to_string()],
            colors: Vec::new(),
            plot_title: None,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            x_label: None,
            y_label: None,
            x_limits: None,
            y_limits: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            group_name: None,
            region_dir: None,
            launch: LaunchMode::default(),
            viewer_program: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl SrvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the `[shm]` and `[viewer]` sections of a config.
    ///
    /// # Errors
    /// `Config` if the configuration fails validation.
    pub fn from_config(config: &VtilsConfig) -> SrvResult<Self> {
        validate_config(config)?;
        let viewer = &config.viewer;
        Ok(Self {
            window_title: viewer.window_title.clone(),
            window_size: (viewer.window_width, viewer.window_height),
            refresh_interval: Duration::from_millis(viewer.refresh_interval_ms),
            region_dir: config.shm.dir.clone(),
            launch: if viewer.headless {
                LaunchMode::Headless
            } else {
                LaunchMode::Spawn
            },
            viewer_program: viewer.program.clone(),
            shutdown_grace: Duration::from_millis(viewer.shutdown_grace_ms),
            ..Self::default()
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_legends<I, S>(mut self, legends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legends = legends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_colors(mut self, colors: impl IntoIterator<Item = Color>) -> Self {
        self.colors = colors.into_iter().collect();
        self
    }

    pub fn with_plot_title(mut self, title: impl Into<String>) -> Self {
        self.plot_title = Some(title.into());
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = Some(label.into());
        self
    }

    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = Some(label.into());
        self
    }

    pub fn with_x_limits(mut self, lo: f64, hi: f64) -> Self {
        self.x_limits = Some((lo, hi));
        self
    }

    pub fn with_y_limits(mut self, lo: f64, hi: f64) -> Self {
        self.y_limits = Some((lo, hi));
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_group_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    pub fn with_region_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.region_dir = Some(dir.into());
        self
    }

    pub fn with_launch_mode(mut self, launch: LaunchMode) -> Self {
        self.launch = launch;
        self
    }

    pub fn with_viewer_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.viewer_program = Some(program.into());
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Color of the series at legend position `index`
    pub fn color_for(&self, index: usize) -> Color {
        self.colors
            .get(index)
            .copied()
            .unwrap_or(DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()])
    }

    /// Reject options a viewer could not be started with.
    ///
    /// Runs before any region is allocated, so a bad legend or refresh
    /// interval fails construction instead of surfacing at `close()`.
    pub fn validate(&self) -> SrvResult<()> {
        if self.capacity < 2 {
            return Err(SrvError::InvalidCapacity(self.capacity));
        }
        if self.legends.is_empty() {
            return Err(SrvError::NoSeries);
        }
        for (i, legend) in self.legends.iter().enumerate() {
            if legend.is_empty() {
                return Err(SrvError::InvalidSeriesSpec {
                    spec: legend.clone(),
                    reason: "series name is empty".to_string(),
                });
            }
            if self.legends[..i].contains(legend) {
                return Err(SrvError::DuplicateSeries(legend.clone()));
            }
        }

        let (min, max) = REFRESH_INTERVAL_RANGE_MS;
        let refresh = self.refresh_interval.as_millis();
        if refresh < u128::from(min) || refresh > u128::from(max) {
            return Err(ConfigError::ValidationError(format!(
                "refresh interval {:?} is outside valid range ({}-{} ms)",
                self.refresh_interval, min, max
            ))
            .into());
        }
        if self.window_size.0 == 0 || self.window_size.1 == 0 {
            return Err(ConfigError::ValidationError(
                "window dimensions must be non-zero".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn region_dir(&self) -> RegionDir {
        match &self.region_dir {
            Some(dir) => RegionDir::new(dir),
            None => RegionDir::system_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SrvOptions::default();
        assert_eq!(options.capacity, 500);
        assert_eq!(options.legends, vec!["data"]);
        assert_eq!(options.window_title, "Simple Remote Viz");
        assert_eq!(options.window_size, (1000, 600));
        assert_eq!(options.refresh_interval, Duration::from_millis(50));
        assert_eq!(options.launch, LaunchMode::Spawn);
    }

    #[test]
    fn test_color_roundtrip() {
        let color: Color = "#e6194b".parse().unwrap();
        assert_eq!(color, DEFAULT_PALETTE[0]);
        assert_eq!(color.to_string(), "#e6194b");
        assert_eq!("00ff00".parse::<Color>().unwrap(), Color::rgb(0, 255, 0));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_for_falls_back_to_palette() {
        let options = SrvOptions::default().with_colors([Color::rgb(1, 2, 3)]);
        assert_eq!(options.color_for(0), Color::rgb(1, 2, 3));
        assert_eq!(options.color_for(1), DEFAULT_PALETTE[1]);
        assert_eq!(options.color_for(9), DEFAULT_PALETTE[1]);
    }

    #[test]
    fn test_from_config() {
        let mut config = VtilsConfig::default();
        config.viewer.refresh_interval_ms = 20;
        config.viewer.headless = true;
        config.shm.dir = Some(PathBuf::from("/tmp/regions"));

        let options = SrvOptions::from_config(&config).unwrap();
        assert_eq!(options.refresh_interval, Duration::from_millis(20));
        assert_eq!(options.launch, LaunchMode::Headless);
        assert_eq!(options.region_dir(), RegionDir::new("/tmp/regions"));
        assert_eq!(options.capacity, DEFAULT_CAPACITY);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = VtilsConfig::default();
        config.viewer.refresh_interval_ms = 0;
        assert!(matches!(
            SrvOptions::from_config(&config),
            Err(SrvError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unlaunchable_options() {
        let base = SrvOptions::default();
        assert!(matches!(
            base.clone().with_legends(["a", ""]).validate(),
            Err(SrvError::InvalidSeriesSpec { .. })
        ));
        assert!(matches!(
            base.clone()
                .with_refresh_interval(Duration::from_secs(11))
                .validate(),
            Err(SrvError::Config(_))
        ));
        assert!(matches!(
            base.clone()
                .with_refresh_interval(Duration::from_micros(500))
                .validate(),
            Err(SrvError::Config(_))
        ));
        assert!(matches!(
            base.clone().with_window_size(0, 600).validate(),
            Err(SrvError::Config(_))
        ));
        // Leading dashes are legal names
        assert!(base.with_legends(["-loss", "reward"]).validate().is_ok());
    }
}
