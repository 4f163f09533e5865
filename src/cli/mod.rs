//! The spec-runner command-line interface.
//!
//! This module is the entry point of the binary: it turns arguments into a
//! [`HarnessConfig`], loads every fixture document up front, and runs them.

use crate::cli::args::{ColorMode, SpecRunnerArgs};
use crate::config::{HarnessConfig, OverrideSource};
use crate::error::HarnessError;
use crate::fixture::{discover_fixture_files, load_group, FixtureGroup};
use crate::harness::Harness;
use crate::overrides::OverrideTable;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
///
/// Exits with 0 when every case passed or was skipped, 1 when any case
/// failed, and 2 when the run could not be carried out at all.
pub fn run() -> ExitCode {
    let args = SpecRunnerArgs::parse();
    init_logging(&args.log_level);

    match run_with_args(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(2)
        }
    }
}

/// Runs the harness; returns whether every case passed or was skipped.
fn run_with_args(args: SpecRunnerArgs) -> Result<bool, HarnessError> {
    let config = config_from_args(&args);
    let overrides = load_overrides(&config.overrides)?;
    let groups = load_groups(&args.paths)?;

    let choice = if config.use_colors {
        ColorChoice::Always
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    let mut harness = Harness::with_sandbox(config, overrides);
    let run = harness.run_all(groups, &mut stdout)?;
    stdout
        .flush()
        .map_err(|source| HarnessError::Output { source })?;
    Ok(!run.has_failures())
}

fn config_from_args(args: &SpecRunnerArgs) -> HarnessConfig {
    let overrides = match (&args.overrides, args.no_overrides) {
        (_, true) => OverrideSource::Disabled,
        (Some(path), false) => OverrideSource::File(path.clone()),
        (None, false) => OverrideSource::Builtin,
    };
    let defaults = HarnessConfig::default();
    HarnessConfig {
        engine: args.engine.clone(),
        entry: args.entry.clone(),
        shell: args.shell.clone(),
        work_dir: args.work_dir.clone(),
        timeout: Duration::from_millis(args.timeout_ms),
        overrides,
        filter: args.filter.clone(),
        use_colors: match args.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => defaults.use_colors,
        },
    }
}

fn load_overrides(source: &OverrideSource) -> Result<OverrideTable, HarnessError> {
    match source {
        OverrideSource::Builtin => OverrideTable::builtin(),
        OverrideSource::File(path) => OverrideTable::load(path),
        OverrideSource::Disabled => Ok(OverrideTable::empty()),
    }
}

/// Loads every document before running anything: a corrupt document stops
/// the whole run.
fn load_groups(paths: &[std::path::PathBuf]) -> Result<Vec<FixtureGroup>, HarnessError> {
    discover_fixture_files(paths)?
        .iter()
        .map(|path| load_group(path))
        .collect()
}

/// Logs go to stderr so they never interleave with the report on stdout.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
