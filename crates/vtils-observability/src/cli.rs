// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-vtils-shm`, `--debug-vtils-srv`, etc.
//! to enable debug logging per crate.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Per-crate debug flags
///
/// # Example
/// ```rust
/// use vtils_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-vtils-shm".to_string()]);
/// assert!(flags.is_enabled("vtils-shm"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut names = Vec::new();
        let mut debug_all = false;

        for arg in args {
            if arg == "--debug-all" {
                debug_all = true;
                continue;
            }
            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                names.push(crate_name.to_string());
            }
        }

        Self::from_names(names, debug_all)
    }

    /// Build flags from already-parsed crate names (e.g. a repeatable clap `--debug <crate>`).
    pub fn from_names<I, S>(names: I, debug_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut enabled_crates: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if debug_all {
            enabled_crates.extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
        }
        CrateDebugFlags { enabled_crates }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Get log level for a crate
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create a tracing filter directive string from debug flags
    ///
    /// Crate names are converted to their module form (`vtils-shm` -> `vtils_shm`),
    /// which is what `EnvFilter` matches targets against.
    /// Format: "vtils_shm=debug,vtils_srv=debug,info".
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|name| format!("{}=debug", name.replace('-', "_")))
            .collect();
        filters.push(default_level.to_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and the `VTILS_DEBUG` variable.
///
/// Environment variable format: comma-separated crate names, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var("VTILS_DEBUG") {
        if env_var == "all" {
            flags
                .enabled_crates
                .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
        } else {
            for crate_name in env_var.split(',') {
                let crate_name = crate_name.trim();
                if !crate_name.is_empty() {
                    flags.enabled_crates.insert(crate_name.to_string());
                }
            }
        }
    }

    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  VTILS_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  VTILS_DEBUG=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-vtils-shm".to_string()]);
        assert!(flags.is_enabled("vtils-shm"));
        assert!(!flags.is_enabled("vtils-srv"));
    }

    #[test]
    fn test_unrelated_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "srv-viewer".to_string(),
            "--group".to_string(),
            "g1".to_string(),
        ]);
        assert!(!flags.any_enabled());
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_filter_string_uses_module_names() {
        let flags = CrateDebugFlags::from_names(["vtils-srv"], false);
        assert_eq!(flags.to_filter_string("warn"), "vtils_srv=debug,warn");
    }

    #[test]
    fn test_filter_string_without_flags() {
        let flags = CrateDebugFlags::default();
        assert_eq!(flags.to_filter_string("INFO"), "info");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_names(["vtils-shm"], false);
        assert_eq!(flags.log_level("vtils-shm"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("vtils-srv"), tracing::Level::INFO);
    }
}
