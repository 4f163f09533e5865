//! Spec-runner harness: drives fixture groups through the case pipeline.
//!
//! Every case goes through the same phases, strictly one after the other:
//! 1. **Resolution**: apply the override table, then the name filter
//! 2. **Execution**: build and run the case script (skipped cases stop here)
//! 3. **Classification**: derive the [`Outcome`] from the case's state
//! 4. **Reporting**: progress line, and a full dump right away for failures
//!
//! Groups run in the order they were loaded and cases in document order, so
//! reports are deterministic. Counters are only touched once a case's run,
//! cleanup included, has finished.

use crate::cli::output;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::fixture::{Case, FixtureGroup};
use crate::overrides::OverrideTable;
use crate::report::{classify, GroupReport, Outcome, RunReport, Tally};
use crate::sandbox::{CaseExecutor, Sandbox};
use termcolor::WriteColor;

/// Runs cases through overrides, an executor and classification.
pub struct Harness<E> {
    config: HarnessConfig,
    overrides: OverrideTable,
    executor: E,
}

impl Harness<Sandbox> {
    /// A harness executing cases in the sandbox described by `config`.
    pub fn with_sandbox(config: HarnessConfig, overrides: OverrideTable) -> Self {
        let sandbox = Sandbox::new(&config);
        Self::new(config, overrides, sandbox)
    }
}

impl<E: CaseExecutor> Harness<E> {
    pub fn new(config: HarnessConfig, overrides: OverrideTable, executor: E) -> Self {
        Self {
            config,
            overrides,
            executor,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Applies overrides and the name filter without running anything.
    pub fn resolve(&self, case: Case) -> Case {
        let mut case = self.overrides.resolve(case);
        if case.skip.is_none() {
            case.skip = self.config.filter_reason(&case.full_name);
        }
        case
    }

    /// Resolves, executes and classifies one case.
    pub fn run_case(&mut self, case: Case) -> (Case, Outcome) {
        let mut case = self.resolve(case);
        if let Some(reason) = &case.skip {
            tracing::debug!(case = %case.full_name, reason = %reason, "skipping case");
            return (case, Outcome::Skip);
        }
        let execution = self.executor.execute(&case);
        case.actual_output = Some(execution.output);
        case.execution_error = execution.error;
        let outcome = classify(&case);
        (case, outcome)
    }

    /// Runs every case of a group, reporting each as it finishes.
    pub fn run_group<W: WriteColor>(
        &mut self,
        group: FixtureGroup,
        out: &mut W,
    ) -> Result<GroupReport, HarnessError> {
        let FixtureGroup { name, cases } = group;
        let mut tally = Tally::default();
        let mut finished = Vec::with_capacity(cases.len());

        for case in cases {
            let (case, outcome) = self.run_case(case);
            output::print_case(out, &case, outcome).map_err(output_error)?;
            if outcome == Outcome::Fail {
                output::print_failure(out, &case).map_err(output_error)?;
            }
            tally.record(outcome);
            finished.push(case);
        }

        let report = GroupReport {
            group: FixtureGroup {
                name,
                cases: finished,
            },
            tally,
        };
        tracing::info!(
            group = %report.group.name,
            passed = tally.passed(),
            failed = tally.fail,
            skipped = tally.skip,
            "group finished"
        );
        output::print_group_summary(out, &report).map_err(output_error)?;
        Ok(report)
    }

    /// Runs all groups in order and prints the final summary.
    pub fn run_all<W: WriteColor>(
        &mut self,
        groups: Vec<FixtureGroup>,
        out: &mut W,
    ) -> Result<RunReport, HarnessError> {
        let mut run = RunReport::default();
        for group in groups {
            run.groups.push(self.run_group(group, out)?);
        }
        output::print_run_summary(out, &run).map_err(output_error)?;
        Ok(run)
    }
}

fn output_error(source: std::io::Error) -> HarnessError {
    HarnessError::Output { source }
}
