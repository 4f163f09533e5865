//! Fixture values to bash initialization text.
//!
//! [`serialize`] is total: every [`Value`] produces some text. Shapes bash
//! cannot represent degrade to a comment or to the [`PLACEHOLDER`] word, so the
//! affected case still runs and fails its comparison instead of aborting.

use crate::value::{Lambda, Value};
use im::OrdMap;
use serde_json::Number;

/// Inert word bound in place of a value that has no shell representation.
pub const PLACEHOLDER: &str = "ERR_CONVERTING";

/// Token bash expands to a single newline.
const NEWLINE_TOKEN: &str = "$'\\n'";

/// Serializes one named fixture value into zero or more lines of bash.
///
/// # Examples
///
/// ```rust
/// use spec_runner::serialize::serialize;
/// use spec_runner::value::Value;
/// assert_eq!(serialize("planet", &Value::from("world")), "planet='world'");
/// assert_eq!(serialize("flag", &Value::from(false)), "flag=\"\"");
/// assert_eq!(serialize("gone", &Value::Null), "# gone is null");
/// ```
pub fn serialize(name: &str, value: &Value) -> String {
    if !is_shell_name(name) {
        return comment(&format!("{name} is not a valid shell variable name"));
    }
    match value {
        Value::Null => comment(&format!("{name} is null")),
        Value::Sequence(items) => serialize_sequence(name, items),
        Value::Map(map) => serialize_map(name, map),
        Value::Lambda(lambda) => serialize_lambda(name, lambda),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            format!("{name}={}", shell_word(value))
        }
    }
}

/// Quotes a string so bash reads it back byte for byte.
///
/// Each newline-free chunk becomes a single-quoted literal and the chunks are
/// joined with `$'\n'`, so multi-line content never depends on how a shell
/// treats raw newlines inside one literal.
pub fn shell_string(s: &str) -> String {
    s.split('\n')
        .map(single_quote)
        .collect::<Vec<_>>()
        .join(NEWLINE_TOKEN)
}

/// Wraps text in single quotes. The text must not contain a newline for the
/// result to be a one-line literal.
pub fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// True when `name` can be bound as a bash variable or function.
pub fn is_shell_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// The scalar encoding rules, shared by top-level bindings, sequence elements
/// and map entries.
fn shell_word(value: &Value) -> String {
    match value {
        Value::String(s) => shell_string(s),
        Value::Number(n) => number_literal(n),
        // The engine treats any non-empty string as truthy.
        Value::Bool(true) => "\"true\"".to_string(),
        Value::Bool(false) => "\"\"".to_string(),
        Value::Null | Value::Sequence(_) | Value::Map(_) | Value::Lambda(_) => {
            PLACEHOLDER.to_string()
        }
    }
}

/// Numbers print the way the fixture corpus' JSON semantics read them:
/// `1.0` is `1`, `1.210` is `1.21`.
fn number_literal(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
            return format!("{f}");
        }
    }
    n.to_string()
}

fn serialize_sequence(name: &str, items: &[Value]) -> String {
    let words: Vec<String> = items.iter().map(shell_word).collect();
    format!("{name}=({})", words.join(" "))
}

fn serialize_map(name: &str, map: &OrdMap<String, Value>) -> String {
    let mut lines = Vec::new();
    let mut entries = Vec::new();
    for (key, value) in map {
        match value {
            v if v.is_object() => lines.push(comment(&format!(
                "{name}.{key} is an object that can not be converted to an associative array"
            ))),
            Value::Null => entries.push(format!("[{}]=''", shell_string(key))),
            v => entries.push(format!("[{}]={}", shell_string(key), shell_word(v))),
        }
    }
    lines.push(format!("declare -A {name}"));
    lines.push(format!("{name}=({})", entries.join(" ")));
    lines.join("\n")
}

fn serialize_lambda(name: &str, lambda: &Lambda) -> String {
    let body = match (&lambda.shell, lambda.alternate("perl")) {
        (Some(shell), _) if !shell.trim().is_empty() => shell.clone(),
        (Some(_), _) => ":".to_string(),
        // Fallback for fixtures that only ship other-language bodies.
        (None, Some(perl)) => format!(
            "perl -e {} -- \"${{1-$(cat)}}\"",
            shell_string(&format!("print(({perl})->(@ARGV))"))
        ),
        (None, None) => format!("printf '%s' {}", single_quote("NO SHELL VERSION OF CODE")),
    };
    format!("{name}() {{\n{body}\n}}")
}

fn comment(text: &str) -> String {
    format!("# {}", text.replace(['\n', '\r'], " "))
}
