// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region namespace: the directory whose files back named regions.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use vtils_config::ShmConfig;

use crate::error::{ShmError, ShmResult};
use crate::layout::{decode_header, HEADER_SIZE};

/// Longest accepted region name in bytes
pub const MAX_NAME_LEN: usize = 200;

/// Directory holding the files that back named regions.
///
/// Two processes see the same region when they use the same directory and
/// name. `/dev/shm` is the default on Linux.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDir {
    root: PathBuf,
}

impl RegionDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform default (`/dev/shm` on Linux, the temp dir elsewhere)
    pub fn system_default() -> Self {
        Self::new(vtils_config::default_region_dir())
    }

    pub fn from_config(config: &ShmConfig) -> Self {
        Self::new(config.region_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backing file path for `name`, validating the name.
    pub fn path_of(&self, name: &str) -> ShmResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Names of all files in the directory that carry a valid region header.
    pub fn list(&self) -> ShmResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_name(&name).is_err() {
                continue;
            }
            let mut header = [0u8; HEADER_SIZE];
            let readable = File::open(entry.path())
                .and_then(|mut f| f.read_exact(&mut header))
                .is_ok();
            if readable && decode_header(&name, &header).is_ok() {
                names.push(name);
            } else {
                debug!(name = %name, "Skipping non-region file");
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Default for RegionDir {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Names are non-empty, at most [`MAX_NAME_LEN`] bytes of `[A-Za-z0-9._-]`,
/// and must not start with `.` (reserved for staging files).
pub fn validate_name(name: &str) -> ShmResult<()> {
    let invalid = |reason| ShmError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 200 bytes"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
    }
    Ok(())
}
