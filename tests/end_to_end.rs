//! End-to-end cases: real bash, the mini engine, and the sandbox.

use serde_json::json;
use spec_runner::fixture::Case;
use spec_runner::harness::Harness;
use spec_runner::overrides::{OverridePatch, OverrideTable};
use spec_runner::report::Outcome;
use spec_runner::sandbox::{CaseExecutor, Sandbox};
use spec_runner::value::Value;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

mod common;
use common::sandbox_config;

fn case(name: &str, data: serde_json::Value, template: &str, expected: &str) -> Case {
    Case::new(name, template, expected)
        .with_data(Value::from(data))
        .in_group("EndToEnd")
}

fn run(case: Case) -> (Case, Outcome) {
    let root = TempDir::new().expect("tempdir");
    let mut harness = Harness::with_sandbox(sandbox_config(&root), OverrideTable::empty());
    harness.run_case(case)
}

#[test]
fn number_interpolation_passes() {
    let number = case("Number", json!({"comment": 4}), "comment = {{comment}}", "comment = 4");
    let (case, outcome) = run(number);
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

#[test]
fn false_takes_the_inverted_branch() {
    let template = "{{#flag}}Y{{/flag}}{{^flag}}N{{/flag}}";
    let (case, outcome) = run(case("False", json!({"flag": false}), template, "N"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

#[test]
fn true_takes_the_section_branch() {
    let template = "{{#flag}}Y{{/flag}}{{^flag}}N{{/flag}}";
    let (case, outcome) = run(case("True", json!({"flag": true}), template, "Y"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

#[test]
fn undefined_entry_point_fails_even_if_output_matches() {
    let root = TempDir::new().expect("tempdir");
    let mut config = sandbox_config(&root);
    config.entry = "no_such_entry_point".to_string();
    let mut sandbox = Sandbox::new(&config);

    let probe = case("Probe", json!({}), "x", "");
    let execution = sandbox.execute(&probe);
    assert!(execution.error.is_some());

    // Expect exactly what the broken script prints.
    let (case, outcome) = Harness::with_sandbox(config, OverrideTable::empty())
        .run_case(case("Broken", json!({}), "x", &execution.output));
    assert_eq!(case.actual_output.as_deref(), Some(case.expected.as_str()));
    assert_eq!(outcome, Outcome::Fail);
}

#[test]
fn data_override_discards_original_bindings() {
    let mut table = OverrideTable::empty();
    table.insert(
        "EndToEnd -> Replaced",
        OverridePatch {
            data: Some(Value::from(json!({"a": "Z"}))),
            ..OverridePatch::default()
        },
    );
    let root = TempDir::new().expect("tempdir");
    let mut harness = Harness::with_sandbox(sandbox_config(&root), table);
    let replaced = case("Replaced", json!({"a": "A", "b": "B"}), "{{a}}{{b}}", "Z");
    let (case, outcome) = harness.run_case(replaced);
    assert_eq!(outcome, Outcome::PassWithOverride, "{case:#?}");
    assert!(!case.actual_output.unwrap_or_default().contains('B'));
}

#[test]
fn skip_override_never_creates_the_working_area() {
    let mut table = OverrideTable::empty();
    table.insert(
        "EndToEnd -> Skipped",
        OverridePatch {
            skip: Some("not supported".to_string()),
            ..OverridePatch::default()
        },
    );
    let root = TempDir::new().expect("tempdir");
    // The working area would live under a regular file, so any attempt to
    // create it would turn the case into a failure.
    fs::write(root.path().join("blocker"), "").expect("blocker");
    let mut config = sandbox_config(&root);
    config.work_dir = root.path().join("blocker").join("spec-runner");
    let work_dir = config.work_dir.clone();
    let mut harness = Harness::with_sandbox(config, table);
    let (case, outcome) = harness.run_case(case("Skipped", json!({}), "x", "x"));
    assert_eq!(outcome, Outcome::Skip);
    assert_eq!(case.actual_output, None);
    assert!(!work_dir.exists());
}

#[test]
fn partials_do_not_leak_between_cases() {
    let root = TempDir::new().expect("tempdir");
    let mut harness = Harness::with_sandbox(sandbox_config(&root), OverrideTable::empty());

    let first = case("First", json!({}), "{{>a}}", "X").with_partial("a", "X");
    let (first, outcome) = harness.run_case(first);
    assert_eq!(outcome, Outcome::Pass, "{first:#?}");

    let (second, outcome) = harness.run_case(case("Second", json!({}), "{{>a}}", "X"));
    assert_eq!(outcome, Outcome::Fail);
    assert!(second.execution_error.is_some());
    assert!(!harness.config().work_dir.exists());
}

#[test]
fn lambda_interpolation() {
    let data = json!({"lambda": {"__tag__": "code", "bash": "echo -n \"world\""}});
    let (case, outcome) = run(case("Lambda", data, "Hello, {{lambda}}!", "Hello, world!"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

#[test]
fn section_lambda_reads_its_content_from_stdin() {
    let data = json!({"lambda": {"__tag__": "code", "bash": "echo -n \"__$(cat)__\""}});
    let (case, outcome) = run(case("Section", data, "<{{#lambda}}FILE{{/lambda}}>", "<__FILE__>"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

#[test]
fn lambda_can_render_again_with_the_same_bindings() {
    let data = json!({
        "lambda": {"__tag__": "code", "bash": "miniMo::render \"{{planet}}\""},
        "planet": "world"
    });
    let (case, outcome) = run(case("Expansion", data, "Hello, {{lambda}}!", "Hello, world!"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}

/// True while `pid` names a process that has not exited yet.
fn running(pid: &str) -> bool {
    fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let state = stat.rsplit(')').next()?.trim_start().chars().next()?;
            Some(state != 'Z' && state != 'X')
        })
        .unwrap_or(false)
}

#[test]
fn timeout_is_an_execution_error_and_keeps_early_output() {
    let root = TempDir::new().expect("tempdir");
    let pid_file = root.path().join("background.pid");
    let engine = root.path().join("slow-engine.sh");
    fs::write(
        &engine,
        format!(
            "mo() {{ printf 'started'; sleep 30 & echo $! > '{}'; wait; }}\n",
            pid_file.display()
        ),
    )
    .expect("engine");
    let mut config = sandbox_config(&root);
    config.engine = engine;
    config.timeout = Duration::from_millis(300);

    let mut harness = Harness::with_sandbox(config, OverrideTable::empty());
    let (case, outcome) = harness.run_case(case("Slow", json!({}), "", "started"));
    assert_eq!(outcome, Outcome::Fail);
    assert_eq!(case.actual_output.as_deref(), Some("started"));
    assert_eq!(
        case.execution_error.as_deref(),
        Some("script timed out after 300 ms")
    );
    assert!(!harness.config().work_dir.exists());

    let pid = fs::read_to_string(&pid_file).expect("pid file");
    let pid = pid.trim();
    let deadline = Instant::now() + Duration::from_secs(2);
    while running(pid) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!running(pid), "background process {pid} outlived the timeout");
}

#[test]
fn partial_names_cannot_leave_the_working_area() {
    let root = TempDir::new().expect("tempdir");
    let mut harness = Harness::with_sandbox(sandbox_config(&root), OverrideTable::empty());

    let escaping = case("Escape", json!({}), "x", "x").with_partial("../escaped", "LEAK");
    let (case, outcome) = harness.run_case(escaping);
    assert_eq!(outcome, Outcome::Fail);
    let error = case.execution_error.expect("execution error");
    assert!(error.contains("does not name a file inside the working area"), "{error}");
    assert!(!root.path().join("escaped").exists());
    assert!(!harness.config().work_dir.exists());
}

#[test]
fn stderr_is_captured_with_stdout() {
    let root = TempDir::new().expect("tempdir");
    let engine = root.path().join("noisy-engine.sh");
    fs::write(&engine, "mo() { printf 'a'; printf 'b' >&2; printf 'c'; }\n").expect("engine");
    let mut config = sandbox_config(&root);
    config.engine = engine;

    let (case, outcome) = Harness::with_sandbox(config, OverrideTable::empty())
        .run_case(case("Noisy", json!({}), "", "abc"));
    assert_eq!(outcome, Outcome::Pass, "{case:#?}");
}
