// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Viewer process launch and supervision

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use vtils_shm::RegionDir;

use crate::error::{SrvError, SrvResult};
use crate::options::{LaunchMode, SrvOptions};

pub const VIEWER_BIN: &str = "srv-viewer";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Locate the viewer executable.
///
/// Order: explicit program, `srv-viewer` next to the current executable (or
/// one level up, which covers test binaries under `target/*/deps`), then
/// `srv-viewer` on `PATH`.
pub fn resolve_viewer_program(configured: Option<&Path>) -> PathBuf {
    if let Some(program) = configured {
        return program.to_path_buf();
    }
    let file_name = format!("{}{}", VIEWER_BIN, std::env::consts::EXE_SUFFIX);
    if let Ok(exe) = std::env::current_exe() {
        let candidates = exe
            .parent()
            .into_iter()
            .flat_map(|dir| [Some(dir), dir.parent()])
            .flatten()
            .map(|dir| dir.join(&file_name));
        for candidate in candidates {
            if candidate.is_file() {
                return candidate;
            }
        }
    }
    PathBuf::from(file_name)
}

/// Command-line arguments telling a viewer how to attach to `group`.
///
/// Every value goes in `--flag=value` form so names and limits starting with
/// `-` are never read as flags.
pub fn viewer_args(
    group: &str,
    dir: &RegionDir,
    options: &SrvOptions,
    headless: bool,
) -> Vec<OsString> {
    let mut region_dir = OsString::from("--region-dir=");
    region_dir.push(dir.root());

    let mut args: Vec<OsString> = vec![
        format!("--group={}", group).into(),
        region_dir,
        format!("--title={}", options.window_title).into(),
        format!("--width={}", options.window_size.0).into(),
        format!("--height={}", options.window_size.1).into(),
        format!("--refresh-ms={}", options.refresh_interval.as_millis()).into(),
    ];
    for (i, legend) in options.legends.iter().enumerate() {
        args.push(format!("--series={}={}", legend, options.color_for(i)).into());
    }
    let optional = [
        ("--plot-title", options.plot_title.clone()),
        ("--x-label", options.x_label.clone()),
        ("--y-label", options.y_label.clone()),
        ("--x-limits", options.x_limits.map(|(lo, hi)| format!("{},{}", lo, hi))),
        ("--y-limits", options.y_limits.map(|(lo, hi)| format!("{},{}", lo, hi))),
    ];
    for (flag, value) in optional {
        if let Some(value) = value {
            args.push(format!("{}={}", flag, value).into());
        }
    }
    if headless {
        args.push("--headless".into());
    }
    args
}

/// A running viewer child process
#[derive(Debug)]
pub struct ViewerProcess {
    child: Child,
    program: PathBuf,
}

impl ViewerProcess {
    pub fn spawn(program: &Path, args: &[OsString]) -> SrvResult<Self> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SrvError::ViewerSpawn {
                program: program.to_path_buf(),
                source,
            })?;
        info!(
            "Launched viewer {} (pid {})",
            program.display(),
            child.id()
        );
        Ok(Self {
            child,
            program: program.to_path_buf(),
        })
    }

    /// Start the viewer `options.launch` asks for, or nothing for `Detached`.
    pub fn launch(group: &str, dir: &RegionDir, options: &SrvOptions) -> SrvResult<Option<Self>> {
        let headless = match options.launch {
            LaunchMode::Detached => {
                debug!("Viewer launch skipped for detached group '{}'", group);
                return Ok(None);
            }
            LaunchMode::Spawn => false,
            LaunchMode::Headless => true,
        };
        let program = resolve_viewer_program(options.viewer_program.as_deref());
        let args = viewer_args(group, dir, options, headless);
        Self::spawn(&program, &args).map(Some)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn try_wait(&mut self) -> SrvResult<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the viewer exits.
    pub fn wait(&mut self) -> SrvResult<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Wait at most `timeout`; `None` if the viewer is still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> SrvResult<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wait up to `grace`, then kill.
    pub fn shutdown(&mut self, grace: Duration) -> SrvResult<ExitStatus> {
        if let Some(status) = self.wait_timeout(grace)? {
            return Ok(status);
        }
        warn!(
            "Viewer (pid {}) still running after {:?}; killing it",
            self.pid(),
            grace
        );
        self.child.kill()?;
        Ok(self.child.wait()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_program_wins() {
        let program = resolve_viewer_program(Some(Path::new("/opt/viewer")));
        assert_eq!(program, PathBuf::from("/opt/viewer"));
    }

    #[test]
    fn test_viewer_args() {
        let options = SrvOptions::default()
            .with_legends(["a", "b"])
            .with_y_limits(-2.0, 3.0)
            .with_plot_title("demo");
        let dir = RegionDir::new("/tmp/r");
        let args: Vec<String> = viewer_args("grp", &dir, &options, true)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();

        assert!(args.contains(&"--group=grp".to_string()));
        assert!(args.contains(&"--region-dir=/tmp/r".to_string()));
        assert!(args.contains(&"--refresh-ms=50".to_string()));
        assert!(args.contains(&"--series=a=#e6194b".to_string()));
        assert!(args.contains(&"--series=b=#4363d8".to_string()));
        assert!(args.contains(&"--y-limits=-2,3".to_string()));
        assert!(args.contains(&"--plot-title=demo".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--x-limits")));
        assert_eq!(args.last().unwrap(), "--headless");
    }

    #[test]
    fn test_viewer_parses_its_launch_args() {
        use clap::Parser;

        use crate::viewer::ViewerArgs;

        let options = SrvOptions::default()
            .with_legends(["-loss", "reward=ema", "--x"])
            .with_window_title("-title")
            .with_x_label("-t")
            .with_x_limits(-10.0, -1.0);
        let dir = RegionDir::new("/tmp/r");
        let argv = std::iter::once(OsString::from(VIEWER_BIN))
            .chain(viewer_args("-grp", &dir, &options, false));

        let parsed = ViewerArgs::try_parse_from(argv).unwrap();
        assert_eq!(parsed.group, "-grp");
        assert_eq!(parsed.title, "-title");
        assert_eq!(parsed.x_label.as_deref(), Some("-t"));
        assert_eq!(parsed.x_limits, Some((-10.0, -1.0)));
        assert!(!parsed.headless);
        let names: Vec<&str> = parsed.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["-loss", "reward=ema", "--x"]);
        assert_eq!(parsed.series[0].color, Some(options.color_for(0)));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let result = ViewerProcess::spawn(Path::new("/nonexistent/srv-viewer"), &[]);
        assert!(matches!(result, Err(SrvError::ViewerSpawn { .. })));
    }
}
