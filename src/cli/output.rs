//! Handles all user-facing report output.
//!
//! Every function writes to a [`WriteColor`], so the CLI hands in a colored
//! `StandardStream` while tests capture plain text in a `termcolor::Buffer`.

// ============================================================================
// CASE LINES AND FAILURE DUMPS
// ============================================================================

use crate::fixture::Case;
use crate::report::{GroupReport, Outcome, RunReport, Tally};
use difference::{Changeset, Difference};
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

const RULE: &str = "=========================================";

/// Prints the one-line progress entry for a finished case.
pub fn print_case<W: WriteColor>(out: &mut W, case: &Case, outcome: Outcome) -> io::Result<()> {
    let (label, color) = match outcome {
        Outcome::Pass => ("PASS", Color::Green),
        Outcome::PassWithOverride => ("PASS (override)", Color::Green),
        Outcome::Fail => ("FAIL", Color::Red),
        Outcome::Skip => ("SKIP", Color::Yellow),
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()?;
    match (&case.skip, outcome) {
        (Some(reason), Outcome::Skip) => writeln!(out, ": {} ({reason})", case.full_name),
        _ => writeln!(out, ": {}", case.full_name),
    }
}

/// Dumps everything known about a failing case: description, the complete
/// case record as JSON, and a line diff of expected against actual output.
pub fn print_failure<W: WriteColor>(out: &mut W, case: &Case) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    writeln!(out, "FAILURE: {}", case.full_name)?;
    out.reset()?;
    writeln!(out)?;
    writeln!(out, "{}", case.description)?;
    writeln!(out)?;
    let record = serde_json::to_string_pretty(case).map_err(io::Error::from)?;
    writeln!(out, "{record}")?;

    if let Some(actual) = &case.actual_output {
        if *actual != case.expected {
            writeln!(out, "Diff (- expected, + actual):")?;
            let changeset = Changeset::new(&case.expected, actual, "\n");
            print_diff(out, &changeset.diffs)?;
        }
    }
    writeln!(out)
}

// ============================================================================
// SUMMARIES
// ============================================================================

/// Prints the results line for one group.
pub fn print_group_summary<W: WriteColor>(out: &mut W, report: &GroupReport) -> io::Result<()> {
    let tally = &report.tally;
    writeln!(
        out,
        "### {} Results = {} passed (with {} overridden), {} failed, {} skipped",
        report.group.name,
        tally.passed(),
        tally.pass_with_override,
        tally.fail,
        tally.skip
    )
}

/// Prints the per-group breakdown, listing failures, and the final totals.
pub fn print_run_summary<W: WriteColor>(out: &mut W, run: &RunReport) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    writeln!(out, "Failed Test Summary")?;
    writeln!(out)?;
    for report in &run.groups {
        write!(out, "* {}: ", report.group.name)?;
        write_counts(out, &report.tally)?;
        writeln!(out)?;
        for case in report.failures() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(out, "    * Failure: {}", case.name)?;
            out.reset()?;
        }
    }
    writeln!(out)?;
    write!(out, "Final result: ")?;
    let total = run.total();
    let color = if total.fail > 0 { Color::Red } else { Color::Green };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write_counts(out, &total)?;
    out.reset()?;
    writeln!(out)
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn write_counts<W: WriteColor>(out: &mut W, tally: &Tally) -> io::Result<()> {
    write!(
        out,
        "{} total, {} pass (with {} overridden), {} fail, {} skip",
        tally.total(),
        tally.passed(),
        tally.pass_with_override,
        tally.fail,
        tally.skip
    )
}

fn print_diff<W: WriteColor>(out: &mut W, diffs: &[Difference]) -> io::Result<()> {
    for diff in diffs {
        let (prefix, color, text) = match diff {
            Difference::Same(x) => (' ', None, x),
            Difference::Add(x) => ('+', Some(Color::Green), x),
            Difference::Rem(x) => ('-', Some(Color::Red), x),
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        for line in text.split('\n') {
            writeln!(out, "{prefix}{line}")?;
        }
    }
    out.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureGroup;
    use termcolor::Buffer;

    fn text(buffer: Buffer) -> String {
        String::from_utf8(buffer.into_inner()).expect("utf8 output")
    }

    #[test]
    fn skip_line_carries_the_reason() {
        let mut case = Case::new("C", "", "").in_group("G");
        case.skip = Some("HTML escaping is not supported".to_string());
        let mut out = Buffer::no_color();
        print_case(&mut out, &case, Outcome::Skip).expect("write");
        assert_eq!(text(out), "SKIP: G -> C (HTML escaping is not supported)\n");
    }

    #[test]
    fn override_pass_is_labelled() {
        let case = Case::new("C", "", "").in_group("G");
        let mut out = Buffer::no_color();
        print_case(&mut out, &case, Outcome::PassWithOverride).expect("write");
        assert_eq!(text(out), "PASS (override): G -> C\n");
    }

    #[test]
    fn failure_dump_contains_record_and_diff() {
        let mut case = Case::new("C", "{{x}}", "one\ntwo").in_group("G");
        case.description = "Explains the case.".to_string();
        case.actual_output = Some("one\nthree".to_string());
        let mut out = Buffer::no_color();
        print_failure(&mut out, &case).expect("write");
        let dump = text(out);
        assert!(dump.starts_with("FAILURE: G -> C\n\nExplains the case.\n\n{"));
        assert!(dump.contains("\"template\": \"{{x}}\""));
        assert!(dump.contains("\"actualOutput\": \"one\\nthree\""));
        assert!(dump.contains("-two\n"));
        assert!(dump.contains("+three\n"));
    }

    #[test]
    fn run_summary_lists_failures_per_group() {
        let mut failing = Case::new("Broken", "", "x").in_group("G");
        failing.actual_output = Some("y".to_string());
        let run = RunReport {
            groups: vec![GroupReport {
                group: FixtureGroup {
                    name: "G".to_string(),
                    cases: vec![failing],
                },
                tally: Tally {
                    pass: 2,
                    pass_with_override: 1,
                    fail: 1,
                    skip: 3,
                },
            }],
        };
        let mut out = Buffer::no_color();
        print_run_summary(&mut out, &run).expect("write");
        let summary = text(out);
        let counts = "7 total, 3 pass (with 1 overridden), 1 fail, 3 skip";
        assert!(summary.contains(&format!("* G: {counts}\n    * Failure: Broken\n")));
        assert!(summary.ends_with(&format!("Final result: {counts}\n")));
    }
}
