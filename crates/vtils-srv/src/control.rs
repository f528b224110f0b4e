// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared control block of a buffer group.
//!
//! A group `G` is a set of regions:
//! ```text
//! G.ctl        u64[8]  control words (below)
//! G.s{i}.x     f64[N]  x values of the i-th series (legend order)
//! G.s{i}.y     f64[N]  y values of the i-th series
//! ```
//! Control words are only ever accessed atomically.

use std::sync::atomic::{fence, AtomicU64, Ordering};

use vtils_shm::{NamedRegion, RegionDir};

use crate::error::SrvResult;

pub const CURSOR: usize = 0;
pub const SAMPLE_COUNT: usize = 1;
pub const GENERATION: usize = 2;
pub const SHUTDOWN: usize = 3;
pub const CAPACITY: usize = 4;
pub const SERIES_COUNT: usize = 5;
pub const VIEWER_PID: usize = 6;
pub const CONTROL_WORDS: usize = 8;

pub fn control_region_name(group: &str) -> String {
    format!("{}.ctl", group)
}

/// Names of the (x, y) regions of the series at legend position `index`
pub fn series_region_names(group: &str, index: usize) -> (String, String) {
    (
        format!("{}.s{}.x", group, index),
        format!("{}.s{}.y", group, index),
    )
}

/// Atomic view of `G.ctl`
#[derive(Debug)]
pub struct ControlBlock {
    region: NamedRegion<u64>,
}

impl ControlBlock {
    pub fn create(
        dir: &RegionDir,
        group: &str,
        capacity: usize,
        series_count: usize,
    ) -> SrvResult<Self> {
        let mut words = [0u64; CONTROL_WORDS];
        words[CAPACITY] = capacity as u64;
        words[SERIES_COUNT] = series_count as u64;
        let region = NamedRegion::create_in(dir, &control_region_name(group), &words)?;
        Ok(Self { region })
    }

    pub fn open(dir: &RegionDir, group: &str) -> SrvResult<Self> {
        let region = NamedRegion::open_in(dir, &control_region_name(group), &[CONTROL_WORDS])?;
        Ok(Self { region })
    }

    fn word(&self, index: usize) -> SrvResult<&AtomicU64> {
        Ok(&self.region.atomics()?[index])
    }

    pub fn load(&self, index: usize) -> SrvResult<u64> {
        Ok(self.word(index)?.load(Ordering::Acquire))
    }

    pub fn store(&self, index: usize, value: u64) -> SrvResult<()> {
        self.word(index)?.store(value, Ordering::Release);
        Ok(())
    }

    pub fn capacity(&self) -> SrvResult<usize> {
        Ok(self.load(CAPACITY)? as usize)
    }

    pub fn series_count(&self) -> SrvResult<usize> {
        Ok(self.load(SERIES_COUNT)? as usize)
    }

    pub fn request_shutdown(&self) -> SrvResult<()> {
        self.store(SHUTDOWN, 1)
    }

    pub fn shutdown_requested(&self) -> SrvResult<bool> {
        Ok(self.load(SHUTDOWN)? != 0)
    }

    /// Mark the group as being written (odd generation) and return the mark.
    pub fn begin_write(&self) -> SrvResult<u64> {
        let generation = self.word(GENERATION)?;
        let current = generation.load(Ordering::Relaxed);
        let begin = if current % 2 == 0 { current + 1 } else { current + 2 };
        generation.store(begin, Ordering::Relaxed);
        fence(Ordering::Release);
        Ok(begin)
    }

    pub fn end_write(&self, begin: u64) -> SrvResult<()> {
        self.word(GENERATION)?
            .store(begin.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    pub fn generation(&self) -> SrvResult<u64> {
        self.load(GENERATION)
    }

    pub fn delete(&mut self) -> SrvResult<()> {
        Ok(self.region.delete()?)
    }
}

/// Run `f` between `begin_write` and `end_write`; the generation is closed
/// even when `f` fails.
pub fn within_generation<R>(
    control: &ControlBlock,
    f: impl FnOnce() -> SrvResult<R>,
) -> SrvResult<R> {
    let begin = control.begin_write()?;
    let result = f();
    control.end_write(begin)?;
    result
}
