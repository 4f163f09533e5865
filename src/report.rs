//! Case classification and result tallies.

use crate::fixture::{Case, FixtureGroup};

/// How a case ended. Always derived from the case's state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// Passed, but only with an override applied.
    PassWithOverride,
    Fail,
    Skip,
}

/// Classifies a case from its skip directive, execution error and output.
///
/// Output comparison is exact: no trimming or newline normalization. An
/// execution error fails the case even when the output matches.
pub fn classify(case: &Case) -> Outcome {
    if case.skip.is_some() {
        return Outcome::Skip;
    }
    if case.execution_error.is_some() {
        return Outcome::Fail;
    }
    if case.actual_output.as_deref() != Some(case.expected.as_str()) {
        return Outcome::Fail;
    }
    if case.override_applied.is_some() {
        Outcome::PassWithOverride
    } else {
        Outcome::Pass
    }
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub pass: usize,
    pub pass_with_override: usize,
    pub fail: usize,
    pub skip: usize,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Pass => self.pass += 1,
            Outcome::PassWithOverride => self.pass_with_override += 1,
            Outcome::Fail => self.fail += 1,
            Outcome::Skip => self.skip += 1,
        }
    }

    /// Clean passes plus passes under override.
    pub fn passed(&self) -> usize {
        self.pass + self.pass_with_override
    }

    pub fn total(&self) -> usize {
        self.passed() + self.fail + self.skip
    }

    pub fn absorb(&mut self, other: &Tally) {
        self.pass += other.pass;
        self.pass_with_override += other.pass_with_override;
        self.fail += other.fail;
        self.skip += other.skip;
    }
}

/// A group after all of its cases ran.
#[derive(Debug, Clone)]
pub struct GroupReport {
    /// The group, each case carrying its run state.
    pub group: FixtureGroup,
    pub tally: Tally,
}

impl GroupReport {
    /// The failing cases, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &Case> {
        self.group
            .cases
            .iter()
            .filter(|case| classify(case) == Outcome::Fail)
    }
}

/// Every group of a run, in run order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    pub fn total(&self) -> Tally {
        let mut total = Tally::default();
        for group in &self.groups {
            total.absorb(&group.tally);
        }
        total
    }

    pub fn has_failures(&self) -> bool {
        self.groups.iter().any(|g| g.tally.fail > 0)
    }
}
