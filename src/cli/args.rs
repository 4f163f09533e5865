//! Defines the command-line arguments for the spec-runner CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "spec-runner",
    version,
    about = "Runs a shell template engine against mustache specification fixtures."
)]
pub struct SpecRunnerArgs {
    /// Fixture documents (.json, .yml, .yaml) or directories containing them.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// File defining the engine under test; sourced by every case script.
    #[arg(long, default_value = "mo")]
    pub engine: PathBuf,

    /// Entry point the engine defines.
    #[arg(long, default_value = "mo")]
    pub entry: String,

    /// Shell used to run case scripts.
    #[arg(long, default_value = "bash")]
    pub shell: String,

    /// Transient working directory, recreated for every case.
    #[arg(long, default_value = "spec-runner")]
    pub work_dir: PathBuf,

    /// Per-case wall-clock timeout in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Override table to use instead of the built-in one.
    #[arg(long, conflicts_with = "no_overrides")]
    pub overrides: Option<PathBuf>,

    /// Run every fixture exactly as written.
    #[arg(long)]
    pub no_overrides: bool,

    /// Only run cases whose full name contains this substring.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// When to color the report.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Report coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_layout() {
        let args = SpecRunnerArgs::parse_from(["spec-runner", "specs"]);
        assert_eq!(args.paths, vec![PathBuf::from("specs")]);
        assert_eq!(args.engine, PathBuf::from("mo"));
        assert_eq!(args.timeout_ms, 2000);
        assert_eq!(args.color, ColorMode::Auto);
        assert!(!args.no_overrides);
    }

    #[test]
    fn override_flags_conflict() {
        let parsed = SpecRunnerArgs::try_parse_from([
            "spec-runner",
            "--overrides",
            "o.yaml",
            "--no-overrides",
            "specs",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn paths_are_required() {
        assert!(SpecRunnerArgs::try_parse_from(["spec-runner"]).is_err());
    }
}
