// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cyclic series buffer
//!
//! Each series keeps `capacity` (x, y) samples in two shared regions. Appends
//! write one row at the cursor across all series, mark the slot ahead of the
//! cursor with a NaN pair (the wrap sentinel) and advance the cursor modulo
//! capacity. The viewer connects only finite points, so the sentinel hides
//! the line that would otherwise run from the newest sample back to the
//! oldest.
//!
//! The producer is the only writer. Every mutation runs inside the group's
//! generation counter so the viewer can discard torn frames; readers that do
//! not check the counter get a best-effort view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};
use vtils_shm::{NamedRegion, RegionDir};

use crate::control::{
    series_region_names, within_generation, ControlBlock, CURSOR, SAMPLE_COUNT, VIEWER_PID,
};
use crate::error::{SrvError, SrvResult};
use crate::launcher::ViewerProcess;
use crate::options::{Color, SrvOptions};

static GROUP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique group name, `srv-<pid>-<n>`
pub fn generate_group_name() -> String {
    format!(
        "srv-{}-{}",
        std::process::id(),
        GROUP_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Replacement content for one coordinate of a series in [`CircularSeriesBuffer::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill<'a> {
    /// Broadcast into every slot
    Scalar(f64),
    /// Exactly `capacity` values
    Values(&'a [f64]),
}

impl From<f64> for Fill<'_> {
    fn from(value: f64) -> Self {
        Fill::Scalar(value)
    }
}

impl<'a> From<&'a [f64]> for Fill<'a> {
    fn from(values: &'a [f64]) -> Self {
        Fill::Values(values)
    }
}

impl<'a> From<&'a Vec<f64>> for Fill<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Fill::Values(values)
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Fill<'a> {
    fn from(values: &'a [f64; N]) -> Self {
        Fill::Values(values)
    }
}

impl Fill<'_> {
    fn check_len(&self, series: &str, capacity: usize) -> SrvResult<()> {
        match self {
            Fill::Values(values) if values.len() != capacity => Err(SrvError::LengthMismatch {
                series: series.to_string(),
                expected: capacity,
                actual: values.len(),
            }),
            _ => Ok(()),
        }
    }

    fn apply(&self, region: &mut NamedRegion<f64>) -> SrvResult<()> {
        match self {
            Fill::Scalar(value) => region.fill(*value)?,
            Fill::Values(values) => region.copy_from(values)?,
        }
        Ok(())
    }
}

/// Copy of one series' backing arrays
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub name: String,
    pub color: Color,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// One named stream of (x, y) samples
#[derive(Debug)]
struct Series {
    name: String,
    color: Color,
    x: NamedRegion<f64>,
    y: NamedRegion<f64>,
}

impl Series {
    fn write(&mut self, index: usize, point: (f64, f64)) -> SrvResult<()> {
        self.x.set(index, point.0)?;
        self.y.set(index, point.1)?;
        Ok(())
    }

    fn fill_nan(&mut self) -> SrvResult<()> {
        self.x.fill(f64::NAN)?;
        self.y.fill(f64::NAN)?;
        Ok(())
    }
}

/// Fixed-capacity ring of (x, y) samples per series, drawn live by a viewer
/// process.
#[derive(Debug)]
pub struct CircularSeriesBuffer {
    group: String,
    dir: RegionDir,
    capacity: usize,
    control: ControlBlock,
    series: Vec<Series>,
    viewer: Option<ViewerProcess>,
    shutdown_grace: Duration,
    released: bool,
}

impl CircularSeriesBuffer {
    /// Allocate the group's regions (zero-initialized) and start the viewer.
    ///
    /// Returns once the viewer process has been launched; it does not wait
    /// for the window to appear.
    pub fn new(options: SrvOptions) -> SrvResult<Self> {
        options.validate()?;

        let group = options
            .group_name
            .clone()
            .unwrap_or_else(generate_group_name);
        let dir = options.region_dir();
        let capacity = options.capacity;

        let mut control = ControlBlock::create(&dir, &group, capacity, options.legends.len())?;
        let mut series: Vec<Series> = Vec::with_capacity(options.legends.len());

        let allocated = (|| -> SrvResult<()> {
            for (i, legend) in options.legends.iter().enumerate() {
                let (x_name, y_name) = series_region_names(&group, i);
                let mut x = NamedRegion::create_zeroed_in(&dir, &x_name, &[capacity])?;
                let y = match NamedRegion::create_zeroed_in(&dir, &y_name, &[capacity]) {
                    Ok(y) => y,
                    Err(e) => {
                        let _ = x.delete();
                        return Err(e.into());
                    }
                };
                series.push(Series {
                    name: legend.clone(),
                    color: options.color_for(i),
                    x,
                    y,
                });
            }
            Ok(())
        })();
        if let Err(e) = allocated {
            release_regions(&mut control, &mut series);
            return Err(e);
        }

        let viewer = match ViewerProcess::launch(&group, &dir, &options) {
            Ok(viewer) => viewer,
            Err(e) => {
                release_regions(&mut control, &mut series);
                return Err(e);
            }
        };
        if let Some(viewer) = &viewer {
            control.store(VIEWER_PID, u64::from(viewer.pid()))?;
        }

        info!(
            "Series buffer '{}' ready: {} series x {} samples",
            group,
            series.len(),
            capacity
        );

        Ok(Self {
            group,
            dir,
            capacity,
            control,
            series,
            viewer,
            shutdown_grace: options.shutdown_grace,
            released: false,
        })
    }

    /// Buffer with default options and the given series names.
    pub fn with_legends<I, S>(capacity: usize, legends: I) -> SrvResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            SrvOptions::default()
                .with_capacity(capacity)
                .with_legends(legends),
        )
    }

    fn index_of(&self, key: &str) -> SrvResult<usize> {
        self.series
            .iter()
            .position(|s| s.name == key)
            .ok_or_else(|| SrvError::KeyNotFound(key.to_string()))
    }

    /// Write one row at the cursor; `None` entries become gaps.
    fn append_row(&mut self, row: &[Option<(f64, f64)>]) -> SrvResult<()> {
        let cursor = self.control.load(CURSOR)? as usize;
        let next = (cursor + 1) % self.capacity;
        let gap = (f64::NAN, f64::NAN);

        let series = &mut self.series;
        let control = &self.control;
        within_generation(control, || {
            for (series, point) in series.iter_mut().zip(row) {
                series.write(cursor, point.unwrap_or(gap))?;
                series.write(next, gap)?;
            }
            control.store(CURSOR, next as u64)?;
            let count = control.load(SAMPLE_COUNT)?;
            control.store(SAMPLE_COUNT, count + 1)
        })
    }

    /// Append one sample to a single-series buffer.
    ///
    /// # Errors
    /// `AmbiguousSeries` when the buffer holds more than one series.
    pub fn append(&mut self, x: f64, y: f64) -> SrvResult<()> {
        if self.series.len() != 1 {
            return Err(SrvError::AmbiguousSeries(self.series.len()));
        }
        self.append_row(&[Some((x, y))])
    }

    /// Append one (x, y) per named series. Series not named get a gap at
    /// this position.
    ///
    /// # Errors
    /// `KeyNotFound` for an unknown key; nothing is written in that case.
    pub fn append_points<K: AsRef<str>>(&mut self, points: &[(K, (f64, f64))]) -> SrvResult<()> {
        let mut row = vec![None; self.series.len()];
        for (key, point) in points {
            row[self.index_of(key.as_ref())?] = Some(*point);
        }
        self.append_row(&row)
    }

    /// Append one y per named series, using the running sample count as x.
    pub fn append_values<K: AsRef<str>>(&mut self, values: &[(K, f64)]) -> SrvResult<()> {
        let x = self.sample_count()? as f64;
        let mut row = vec![None; self.series.len()];
        for (key, y) in values {
            row[self.index_of(key.as_ref())?] = Some((x, *y));
        }
        self.append_row(&row)
    }

    /// Replace one series' arrays wholesale. The cursor is not touched.
    ///
    /// # Errors
    /// `KeyNotFound`, or `LengthMismatch` if a value slice is not exactly
    /// `capacity` long. Both are checked before anything is written.
    pub fn update<'a>(
        &mut self,
        key: &str,
        x: impl Into<Fill<'a>>,
        y: impl Into<Fill<'a>>,
    ) -> SrvResult<()> {
        let (x, y) = (x.into(), y.into());
        let index = self.index_of(key)?;
        x.check_len(key, self.capacity)?;
        y.check_len(key, self.capacity)?;

        let series = &mut self.series[index];
        within_generation(&self.control, || {
            x.apply(&mut series.x)?;
            y.apply(&mut series.y)
        })?;
        debug!("Series '{}' of '{}' replaced", key, self.group);
        Ok(())
    }

    /// Reset series to all-NaN. `None` clears every series and also resets
    /// the cursor and the sample count.
    pub fn clear(&mut self, keys: Option<&[&str]>) -> SrvResult<()> {
        let targets: Vec<usize> = match keys {
            Some(keys) => keys
                .iter()
                .map(|k| self.index_of(k))
                .collect::<SrvResult<_>>()?,
            None => (0..self.series.len()).collect(),
        };

        let series = &mut self.series;
        let control = &self.control;
        within_generation(control, || {
            for &i in &targets {
                series[i].fill_nan()?;
            }
            if keys.is_none() {
                control.store(CURSOR, 0)?;
                control.store(SAMPLE_COUNT, 0)?;
            }
            Ok(())
        })
    }

    /// Clear every series.
    pub fn clear_all(&mut self) -> SrvResult<()> {
        self.clear(None)
    }

    pub fn series(&self, key: &str) -> SrvResult<SeriesSnapshot> {
        let series = &self.series[self.index_of(key)?];
        Ok(SeriesSnapshot {
            name: series.name.clone(),
            color: series.color,
            x: series.x.to_vec()?,
            y: series.y.to_vec()?,
        })
    }

    pub fn cursor(&self) -> SrvResult<usize> {
        Ok(self.control.load(CURSOR)? as usize)
    }

    pub fn sample_count(&self) -> SrvResult<u64> {
        self.control.load(SAMPLE_COUNT)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn legends(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn group_name(&self) -> &str {
        &self.group
    }

    pub fn region_dir(&self) -> &RegionDir {
        &self.dir
    }

    pub fn viewer_pid(&self) -> Option<u32> {
        self.viewer.as_ref().map(ViewerProcess::pid)
    }

    /// True once the viewer process has exited (always false when detached).
    pub fn viewer_exited(&mut self) -> SrvResult<bool> {
        match self.viewer.as_mut() {
            Some(viewer) => Ok(viewer.try_wait()?.is_some()),
            None => Ok(false),
        }
    }

    /// Tell the viewer to stop, wait for it, then delete every region.
    ///
    /// # Errors
    /// `ViewerFailed` if the viewer exited unsuccessfully. Regions are
    /// deleted regardless.
    pub fn close(mut self) -> SrvResult<()> {
        self.release(true, None)
    }

    /// Wait for the viewer to exit on its own (its window was closed), then
    /// delete every region.
    pub fn join(mut self) -> SrvResult<()> {
        self.release(false, None)
    }

    fn release(&mut self, signal: bool, grace: Option<Duration>) -> SrvResult<()> {
        self.released = true;
        if signal {
            if let Err(e) = self.control.request_shutdown() {
                warn!("Could not signal viewer of '{}': {}", self.group, e);
            }
        }

        let status = match self.viewer.take() {
            Some(mut viewer) => {
                let status = match grace {
                    Some(grace) => viewer.shutdown(grace),
                    None => viewer.wait(),
                };
                Some((viewer.program().to_path_buf(), status))
            }
            None => None,
        };

        release_regions(&mut self.control, &mut self.series);
        info!("Series buffer '{}' released", self.group);

        match status {
            Some((program, Ok(status))) if !status.success() => Err(SrvError::ViewerFailed {
                program,
                status: status.to_string(),
            }),
            Some((_, Err(e))) => Err(e),
            _ => Ok(()),
        }
    }
}

/// Delete every region of a group, logging failures.
fn release_regions(control: &mut ControlBlock, series: &mut Vec<Series>) {
    for mut s in series.drain(..) {
        for region in [&mut s.x, &mut s.y] {
            if let Err(e) = region.delete() {
                warn!("Failed to delete region '{}': {}", region.name(), e);
            }
        }
    }
    if let Err(e) = control.delete() {
        warn!("Failed to delete control region: {}", e);
    }
}

impl Drop for CircularSeriesBuffer {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "Series buffer '{}' dropped without close(); shutting down viewer",
            self.group
        );
        let grace = self.shutdown_grace;
        if let Err(e) = self.release(true, Some(grace)) {
            warn!("Series buffer '{}' teardown: {}", self.group, e);
        }
    }
}
