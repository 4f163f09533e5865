//! Shared helpers for the integration tests.

#![allow(dead_code)]

use spec_runner::config::HarnessConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// The minimal bash engine the integration tests render with.
pub fn mini_engine() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/engine/mini-mo.sh")
}

pub fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A configuration running the mini engine with its working area in `root`.
pub fn sandbox_config(root: &TempDir) -> HarnessConfig {
    HarnessConfig {
        engine: mini_engine(),
        work_dir: root.path().join("spec-runner"),
        timeout: Duration::from_secs(5),
        use_colors: false,
        ..HarnessConfig::default()
    }
}
