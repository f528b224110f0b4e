// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reading frames out of a buffer group from the viewer side

use std::sync::atomic::{fence, Ordering};

use tracing::{debug, info};
use vtils_shm::{NamedRegion, RegionDir};

use crate::control::{control_region_name, series_region_names, ControlBlock, CURSOR, SAMPLE_COUNT};
use crate::error::{SrvError, SrvResult};
use crate::options::{Color, DEFAULT_PALETTE};

/// Attempts at an untorn frame before falling back to a best-effort copy
pub const MAX_READ_RETRIES: usize = 64;

/// Series name and optional color, as given on the viewer command line
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub name: String,
    pub color: Option<Color>,
}

impl std::str::FromStr for SeriesSpec {
    type Err = SrvError;

    /// `name` or `name=#rrggbb`
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (name, color) = match spec.rsplit_once('=') {
            Some((name, color)) => (name, Some(color.parse::<Color>()?)),
            None => (spec, None),
        };
        if name.is_empty() {
            return Err(SrvError::InvalidSeriesSpec {
                spec: spec.to_string(),
                reason: "series name is empty".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            color,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    pub name: String,
    pub color: Color,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// One snapshot of every series in a group
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub generation: u64,
    /// False when the producer kept writing and the copy may be torn
    pub consistent: bool,
    pub cursor: usize,
    pub sample_count: u64,
    pub series: Vec<SeriesFrame>,
}

struct AttachedSeries {
    name: String,
    color: Color,
    x: NamedRegion<f64>,
    y: NamedRegion<f64>,
}

/// Read-only attachment to every region of a buffer group
pub struct FrameSource {
    dir: RegionDir,
    group: String,
    capacity: usize,
    control: ControlBlock,
    series: Vec<AttachedSeries>,
}

impl FrameSource {
    /// Attach to `group`. With no `specs`, series are named `s0`, `s1`, ...
    /// and colored from the default palette.
    pub fn attach(dir: &RegionDir, group: &str, specs: &[SeriesSpec]) -> SrvResult<Self> {
        let control = ControlBlock::open(dir, group)?;
        let capacity = control.capacity()?;
        let series_count = control.series_count()?;

        let specs: Vec<SeriesSpec> = if specs.is_empty() {
            (0..series_count)
                .map(|i| SeriesSpec {
                    name: format!("s{}", i),
                    color: None,
                })
                .collect()
        } else {
            specs.to_vec()
        };
        if specs.len() != series_count {
            return Err(SrvError::LengthMismatch {
                series: format!("{} (series list)", group),
                expected: series_count,
                actual: specs.len(),
            });
        }

        let mut series = Vec::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            let (x_name, y_name) = series_region_names(group, i);
            series.push(AttachedSeries {
                color: spec
                    .color
                    .unwrap_or(DEFAULT_PALETTE[i % DEFAULT_PALETTE.len()]),
                name: spec.name,
                x: NamedRegion::open_in(dir, &x_name, &[capacity])?,
                y: NamedRegion::open_in(dir, &y_name, &[capacity])?,
            });
        }

        info!(
            "Viewer attached to '{}': {} series x {} samples",
            group, series_count, capacity
        );
        Ok(Self {
            dir: dir.clone(),
            group: group.to_string(),
            capacity,
            control,
            series,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn series_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// True when the producer asked the viewer to exit, or its regions are gone.
    pub fn should_exit(&self) -> SrvResult<bool> {
        if self.control.shutdown_requested()? {
            debug!("Shutdown requested for '{}'", self.group);
            return Ok(true);
        }
        if !self.dir.exists(&control_region_name(&self.group)) {
            info!("Regions of '{}' were removed; producer is gone", self.group);
            return Ok(true);
        }
        Ok(false)
    }

    fn copy_frame(&self, generation: u64, consistent: bool) -> SrvResult<Frame> {
        let mut series = Vec::with_capacity(self.series.len());
        for s in &self.series {
            series.push(SeriesFrame {
                name: s.name.clone(),
                color: s.color,
                x: s.x.to_vec()?,
                y: s.y.to_vec()?,
            });
        }
        Ok(Frame {
            generation,
            consistent,
            cursor: self.control.load(CURSOR)? as usize,
            sample_count: self.control.load(SAMPLE_COUNT)?,
            series,
        })
    }

    /// Snapshot every series, retrying while the producer is mid-write.
    ///
    /// After `max_retries` failed attempts the best-effort copy is returned
    /// with `consistent == false`.
    pub fn read_frame(&self, max_retries: usize) -> SrvResult<Frame> {
        for _ in 0..=max_retries {
            let before = self.control.generation()?;
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let frame = self.copy_frame(before, true)?;
            fence(Ordering::Acquire);
            if self.control.generation()? == before {
                return Ok(frame);
            }
        }
        debug!("Frame of '{}' may be torn", self.group);
        self.copy_frame(self.control.generation()?, false)
    }
}

/// Split a series into runs of consecutive finite points, in index order.
///
/// NaN and infinite values (the wrap sentinel, cleared slots, gaps) end a run
/// and are never drawn.
pub fn finite_segments(x: &[f64], y: &[f64]) -> Vec<Vec<[f64; 2]>> {
    let mut segments = Vec::new();
    let mut current: Vec<[f64; 2]> = Vec::new();
    for (&x, &y) in x.iter().zip(y) {
        if x.is_finite() && y.is_finite() {
            current.push([x, y]);
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Axis-aligned bounds `(min, max)` of all finite points of a frame, with
/// fixed axis limits applied and degenerate ranges widened.
pub fn plot_bounds(
    frame: &Frame,
    x_limits: Option<(f64, f64)>,
    y_limits: Option<(f64, f64)>,
) -> ([f64; 2], [f64; 2]) {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for s in &frame.series {
        for (&x, &y) in s.x.iter().zip(&s.y) {
            if x.is_finite() && y.is_finite() {
                min = [min[0].min(x), min[1].min(y)];
                max = [max[0].max(x), max[1].max(y)];
            }
        }
    }
    for (axis, limits) in [x_limits, y_limits].into_iter().enumerate() {
        if let Some((lo, hi)) = limits {
            min[axis] = lo;
            max[axis] = hi;
        }
        if !min[axis].is_finite() || !max[axis].is_finite() {
            // Nothing to draw on this axis
            min[axis] = 0.0;
            max[axis] = 1.0;
        } else if min[axis] >= max[axis] {
            let mid = min[axis];
            min[axis] = mid - 0.5;
            max[axis] = mid + 0.5;
        }
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CircularSeriesBuffer;
    use crate::options::{LaunchMode, SrvOptions};

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_finite_segments_split_on_nan() {
        let x = [0.0, 1.0, NAN, 3.0, 4.0, 5.0];
        let y = [0.0, 1.0, 2.0, 9.0, NAN, 25.0];
        let segments = finite_segments(&x, &y);
        assert_eq!(
            segments,
            vec![vec![[0.0, 0.0], [1.0, 1.0]], vec![[3.0, 9.0]], vec![[5.0, 25.0]]]
        );
    }

    #[test]
    fn test_finite_segments_all_nan() {
        assert!(finite_segments(&[NAN; 4], &[NAN; 4]).is_empty());
        assert!(finite_segments(&[], &[]).is_empty());
    }

    #[test]
    fn test_series_spec_parsing() {
        let spec: SeriesSpec = "loss=#ff0000".parse().unwrap();
        assert_eq!(spec.name, "loss");
        assert_eq!(spec.color, Some(Color::rgb(255, 0, 0)));

        let bare: SeriesSpec = "reward".parse().unwrap();
        assert_eq!(bare.color, None);

        assert!("=#ff0000".parse::<SeriesSpec>().is_err());
        assert!("a=red".parse::<SeriesSpec>().is_err());
    }

    fn sample_frame(x: Vec<f64>, y: Vec<f64>) -> Frame {
        Frame {
            generation: 0,
            consistent: true,
            cursor: 0,
            sample_count: 0,
            series: vec![SeriesFrame {
                name: "s".to_string(),
                color: DEFAULT_PALETTE[0],
                x,
                y,
            }],
        }
    }

    #[test]
    fn test_plot_bounds() {
        let frame = sample_frame(vec![0.0, 2.0, NAN], vec![-1.0, 5.0, NAN]);
        assert_eq!(plot_bounds(&frame, None, None), ([0.0, -1.0], [2.0, 5.0]));
        assert_eq!(
            plot_bounds(&frame, Some((-1.0, 100.0)), None),
            ([-1.0, -1.0], [100.0, 5.0])
        );

        let empty = sample_frame(vec![NAN], vec![NAN]);
        assert_eq!(plot_bounds(&empty, None, Some((-2.0, 3.0))), ([0.0, -2.0], [1.0, 3.0]));

        let single = sample_frame(vec![4.0], vec![4.0]);
        assert_eq!(plot_bounds(&single, None, None), ([3.5, 3.5], [4.5, 4.5]));
    }

    #[test]
    fn test_attach_and_read_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let mut buffer = CircularSeriesBuffer::new(
            SrvOptions::default()
                .with_capacity(4)
                .with_legends(["a", "b"])
                .with_group_name("frames")
                .with_region_dir(tmp.path())
                .with_launch_mode(LaunchMode::Detached),
        )
        .unwrap();
        buffer.append_values(&[("a", 1.0), ("b", 2.0)]).unwrap();

        let dir = RegionDir::new(tmp.path());
        let source = FrameSource::attach(&dir, "frames", &[]).unwrap();
        assert_eq!(source.series_names(), vec!["s0", "s1"]);
        assert!(!source.should_exit().unwrap());

        let frame = source.read_frame(MAX_READ_RETRIES).unwrap();
        assert!(frame.consistent);
        assert_eq!(frame.generation, 2);
        assert_eq!(frame.cursor, 1);
        assert_eq!(frame.series[1].y[0], 2.0);
        assert!(frame.series[1].y[1].is_nan());

        buffer.close().unwrap();
        assert!(source.should_exit().unwrap());
    }

    #[test]
    fn test_attach_with_wrong_series_count() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = CircularSeriesBuffer::new(
            SrvOptions::default()
                .with_capacity(4)
                .with_group_name("counted")
                .with_region_dir(tmp.path())
                .with_launch_mode(LaunchMode::Detached),
        )
        .unwrap();
        let specs: Vec<SeriesSpec> = vec!["a".parse().unwrap(), "b".parse().unwrap()];
        let result = FrameSource::attach(&RegionDir::new(tmp.path()), "counted", &specs);
        assert!(matches!(result, Err(SrvError::LengthMismatch { expected: 1, actual: 2, .. })));
        buffer.close().unwrap();
    }
}
