// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Window-less viewer loop

use std::time::Duration;

use tracing::{debug, info};

use super::frame::{finite_segments, FrameSource, MAX_READ_RETRIES};
use crate::error::SrvResult;

/// Counters collected by [`run_headless`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessReport {
    pub frames: u64,
    pub torn_frames: u64,
    /// True when the loop ended on a shutdown request rather than `max_frames`
    pub shutdown: bool,
}

/// Poll the group every `refresh` until shutdown (or `max_frames` frames).
pub fn run_headless(
    source: &FrameSource,
    refresh: Duration,
    max_frames: Option<u64>,
) -> SrvResult<HeadlessReport> {
    let mut report = HeadlessReport::default();
    info!(
        "Headless viewer running for '{}' every {:?}",
        source.group(),
        refresh
    );

    loop {
        if source.should_exit()? {
            report.shutdown = true;
            break;
        }
        if max_frames.is_some_and(|max| report.frames >= max) {
            break;
        }

        let frame = source.read_frame(MAX_READ_RETRIES)?;
        report.frames += 1;
        if !frame.consistent {
            report.torn_frames += 1;
        }
        let segments: usize = frame
            .series
            .iter()
            .map(|s| finite_segments(&s.x, &s.y).len())
            .sum();
        debug!(
            generation = frame.generation,
            cursor = frame.cursor,
            samples = frame.sample_count,
            segments,
            "frame"
        );

        std::thread::sleep(refresh);
    }

    info!(
        "Headless viewer for '{}' stopped after {} frames ({} torn)",
        source.group(),
        report.frames,
        report.torn_frames
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CircularSeriesBuffer;
    use crate::options::{LaunchMode, SrvOptions};
    use vtils_shm::RegionDir;

    #[test]
    fn test_stops_after_max_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = CircularSeriesBuffer::new(
            SrvOptions::default()
                .with_capacity(8)
                .with_group_name("headless-max")
                .with_region_dir(tmp.path())
                .with_launch_mode(LaunchMode::Detached),
        )
        .unwrap();
        let source = FrameSource::attach(&RegionDir::new(tmp.path()), "headless-max", &[]).unwrap();

        let report = run_headless(&source, Duration::from_millis(1), Some(3)).unwrap();
        assert_eq!(report.frames, 3);
        assert!(!report.shutdown);
        buffer.close().unwrap();
    }

    #[test]
    fn test_stops_on_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let buffer = CircularSeriesBuffer::new(
            SrvOptions::default()
                .with_capacity(8)
                .with_group_name("headless-stop")
                .with_region_dir(tmp.path())
                .with_launch_mode(LaunchMode::Detached),
        )
        .unwrap();
        let source =
            FrameSource::attach(&RegionDir::new(tmp.path()), "headless-stop", &[]).unwrap();

        buffer.close().unwrap();
        let report = run_headless(&source, Duration::from_millis(1), None).unwrap();
        assert!(report.shutdown);
        assert_eq!(report.frames, 0);
    }
}
