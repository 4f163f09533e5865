//! Harness configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Wall-clock budget for a single case script.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the override table comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverrideSource {
    /// The table compiled into the harness.
    #[default]
    Builtin,
    /// A YAML table on disk.
    File(PathBuf),
    /// No overrides at all: every fixture runs as written.
    Disabled,
}

/// Configuration for case execution and reporting.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// File defining the engine under test; sourced by every case script.
    pub engine: PathBuf,
    /// Entry point the engine defines.
    pub entry: String,
    /// Shell that runs the case scripts.
    pub shell: String,
    /// Transient working area, created and removed for every case.
    pub work_dir: PathBuf,
    pub timeout: Duration,
    pub overrides: OverrideSource,
    /// Only cases whose full name contains this substring are run.
    pub filter: Option<String>,
    pub use_colors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: PathBuf::from("mo"),
            entry: "mo".to_string(),
            shell: "bash".to_string(),
            work_dir: PathBuf::from("spec-runner"),
            timeout: DEFAULT_TIMEOUT,
            overrides: OverrideSource::default(),
            filter: None,
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl HarnessConfig {
    /// Skip reason for a case excluded by the name filter.
    pub fn filter_reason(&self, full_name: &str) -> Option<String> {
        let filter = self.filter.as_deref()?;
        if full_name.to_lowercase().contains(&filter.to_lowercase()) {
            None
        } else {
            Some(format!("filtered out by substring: {filter}"))
        }
    }
}
