//! Harness error type.
//!
//! Only fixture-loading and override-table errors are fatal to a run. Anything
//! that goes wrong while a single case is executing is folded into that case's
//! execution error text by the sandbox, so it surfaces as a failing case.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the harness itself, as opposed to the engine under test.
#[derive(Error, Diagnostic, Debug)]
pub enum HarnessError {
    #[error("failed to read fixture document {}", path.display())]
    #[diagnostic(code(spec_runner::fixture::io))]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed fixture document: {message}")]
    #[diagnostic(
        code(spec_runner::fixture::parse),
        help("a corrupt fixture document cannot be partially interpreted; fix it and rerun")
    )]
    FixtureParse {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("parse error here")]
        span: SourceSpan,
    },

    #[error("no fixture documents found under {}", path.display())]
    #[diagnostic(
        code(spec_runner::fixture::empty),
        help("fixture documents must end in .json, .yml or .yaml")
    )]
    NoFixtures { path: PathBuf },

    #[error("failed to read override table {}", path.display())]
    #[diagnostic(code(spec_runner::overrides::io))]
    OverrideIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed override table: {message}")]
    #[diagnostic(code(spec_runner::overrides::parse))]
    OverrideParse {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("parse error here")]
        span: SourceSpan,
    },

    #[error("failed to {action} working area {}", path.display())]
    #[diagnostic(code(spec_runner::sandbox::work_area))]
    WorkArea {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start `{program}`")]
    #[diagnostic(
        code(spec_runner::sandbox::spawn),
        help("check that the configured shell is installed and on PATH")
    )]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write the report")]
    #[diagnostic(code(spec_runner::report::io))]
    Output {
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for the case script")]
    #[diagnostic(code(spec_runner::sandbox::wait))]
    Wait {
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    /// Builds a fixture parse error pointing at the parser's reported position.
    pub fn fixture_parse(name: &str, content: &str, message: String, offset: usize) -> Self {
        HarnessError::FixtureParse {
            message,
            src: named_source(name, content),
            span: point_at(content, offset),
        }
    }

    /// Builds an override parse error pointing at the parser's reported position.
    pub fn override_parse(name: &str, content: &str, message: String, offset: usize) -> Self {
        HarnessError::OverrideParse {
            message,
            src: named_source(name, content),
            span: point_at(content, offset),
        }
    }
}

fn named_source(name: &str, content: &str) -> Arc<NamedSource<String>> {
    Arc::new(NamedSource::new(name, content.to_string()))
}

fn point_at(content: &str, offset: usize) -> SourceSpan {
    (offset.min(content.len()), 0).into()
}

/// Converts a 1-based line/column pair, as reported by `serde_json`, into a
/// byte offset into `content`.
pub fn line_column_offset(content: &str, line: usize, column: usize) -> usize {
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(content.len())
}
