// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! `shm_inspect` against regions created in a temporary directory

use std::process::Command;

use vtils::shm::{NamedRegion, RegionDir};

const INSPECT: &str = env!("CARGO_BIN_EXE_shm_inspect");

fn inspect(dir: &RegionDir, args: &[&str]) -> std::process::Output {
    Command::new(INSPECT)
        .arg("--dir")
        .arg(dir.root())
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_json_header() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = RegionDir::new(tmp.path());
    let _region = NamedRegion::<f32>::create_zeroed_in(&dir, "grid", &[3, 4]).unwrap();

    let output = inspect(&dir, &["grid", "--json"]);
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["name"], "grid");
    assert_eq!(info["dtype"], "F32");
    assert_eq!(info["shape"], serde_json::json!([3, 4]));
    assert_eq!(info["byte_size"], 48);
}

#[test]
fn test_list_and_unlink() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = RegionDir::new(tmp.path());
    let _a = NamedRegion::<u8>::create_zeroed_in(&dir, "a", &[1]).unwrap();
    let _b = NamedRegion::<u8>::create_zeroed_in(&dir, "b", &[1]).unwrap();

    let listed = inspect(&dir, &["--list"]);
    assert!(listed.status.success());
    let text = String::from_utf8(listed.stdout).unwrap();
    assert_eq!(text.lines().count(), 2);

    let removed = inspect(&dir, &["a", "--unlink"]);
    assert!(removed.status.success());
    assert_eq!(dir.list().unwrap(), vec!["b".to_string()]);
}

#[test]
fn test_missing_region_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = RegionDir::new(tmp.path());
    let output = inspect(&dir, &["ghost"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}
