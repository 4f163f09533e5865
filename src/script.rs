//! Builds the bash script that renders one case.
//!
//! The script binds the case's data, sources the engine into the same shell
//! process so that lambda functions stay callable from it, and finally calls
//! the engine's entry point on the materialized template. It performs no
//! error checking of its own: the sandbox judges the run by exit status and
//! captured output.

use crate::fixture::Case;
use crate::serialize::{serialize, shell_string};
use crate::value::Value;
use std::path::Path;

/// File name of the script inside the working area.
pub const SCRIPT_FILE: &str = "spec-script";
/// File name of the case's template inside the working area.
pub const TEMPLATE_FILE: &str = "spec-template";

const INTERPRETER_DIRECTIVE: &str = "#!/usr/bin/env bash";

/// How the script reaches the engine under test.
#[derive(Debug, Clone)]
pub struct EngineInvocation<'a> {
    /// Path of the file defining the engine, sourced into the script.
    pub engine: &'a Path,
    /// Entry point the engine defines.
    pub entry: &'a str,
}

/// Assembles the script for `case`.
///
/// # Examples
///
/// ```rust
/// use spec_runner::fixture::Case;
/// use spec_runner::script::{build, EngineInvocation};
/// use spec_runner::value::Value;
/// use std::path::Path;
///
/// let case = Case::new("c", "{{x}}", "1").with_data(Value::map([("x", Value::from(1))]));
/// let engine = EngineInvocation { engine: Path::new("/opt/mo"), entry: "mo" };
/// assert_eq!(
///     build(&case, &engine),
///     "#!/usr/bin/env bash\nx=1\n. '/opt/mo'\nmo spec-template\n"
/// );
/// ```
pub fn build(case: &Case, engine: &EngineInvocation<'_>) -> String {
    let mut lines = vec![INTERPRETER_DIRECTIVE.to_string()];
    match &case.data {
        Value::Map(data) => {
            lines.extend(data.iter().map(|(name, value)| serialize(name, value)));
        }
        Value::Null => {}
        other => lines.push(format!(
            "# data is a {} rather than a map; nothing is bound",
            other.type_name()
        )),
    }
    lines.push(format!(". {}", shell_string(&engine.engine.to_string_lossy())));
    lines.push(format!("{} {TEMPLATE_FILE}", engine.entry));
    lines.push(String::new());
    lines.join("\n")
}
