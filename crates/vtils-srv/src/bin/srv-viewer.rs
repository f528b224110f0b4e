// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! `srv-viewer`: draws a series buffer group until its producer shuts it down.
//!
//! Per-crate debug logging: `--debug-vtils-srv`, `--debug-all` or `VTILS_DEBUG`.

use anyhow::Context;
use clap::Parser;
use vtils_config::load_config_or_default;
use vtils_observability::{init_logging, parse_debug_flags};
use vtils_srv::viewer::{self, ViewerArgs};

fn main() -> anyhow::Result<()> {
    let debug_flags = parse_debug_flags();
    let args = ViewerArgs::parse_from(std::env::args().filter(|a| !a.starts_with("--debug-")));

    let config = load_config_or_default(None, None).context("Failed to load configuration")?;
    let _logging = init_logging(
        &debug_flags,
        &config.logging.level,
        config.logging.log_dir.clone(),
    )?;

    viewer::run(args, &config)
}
