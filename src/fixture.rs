//! Fixture documents: discovery, loading and the case model.
//!
//! A fixture document is JSON or YAML with a `tests` list. Each loaded
//! document becomes one [`FixtureGroup`] named after its file.

use crate::error::{line_column_offset, HarnessError};
use crate::overrides::AppliedOverride;
use crate::value::{yaml_to_json, Value};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Separator between group and case name in a full name.
pub const FULL_NAME_SEPARATOR: &str = " -> ";

/// One fixture document's worth of cases.
#[derive(Debug, Clone)]
pub struct FixtureGroup {
    pub name: String,
    pub cases: Vec<Case>,
}

/// A single fixture case plus the state the pipeline appends to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub name: String,
    #[serde(default, rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub data: Value,
    pub template: String,
    pub expected: String,
    #[serde(default)]
    pub partials: OrdMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_applied: Option<AppliedOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
}

impl Case {
    /// Creates a case with no data, partials or run state.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            description: String::new(),
            data: Value::Map(OrdMap::new()),
            template: template.into(),
            expected: expected.into(),
            partials: OrdMap::new(),
            skip: None,
            override_applied: None,
            actual_output: None,
            execution_error: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_partial(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.partials.insert(name.into(), text.into());
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.full_name = full_name(group, &self.name);
        self
    }
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    tests: Vec<Case>,
}

/// Joins a group and case name into the key used by override tables.
pub fn full_name(group: &str, case: &str) -> String {
    format!("{group}{FULL_NAME_SEPARATOR}{case}")
}

/// Derives a group name from a fixture path: `specs/~lambdas.json` becomes
/// `Lambdas`, `dynamic-names.yml` becomes `Dynamic-Names`.
pub fn group_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = String::with_capacity(stem.len());
    let mut at_word_start = true;
    for c in stem.chars().filter(|&c| c != '~') {
        if at_word_start {
            name.extend(c.to_uppercase());
        } else {
            name.push(c);
        }
        at_word_start = c == '-';
    }
    name
}

fn is_fixture_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "json" || ext == "yml" || ext == "yaml")
        .unwrap_or(false)
}

/// Expands the given paths into fixture files. Directories are searched
/// recursively and their contents sorted; explicit files are kept in the
/// order given.
pub fn discover_fixture_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, HarnessError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_fixture_file(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        if found.is_empty() {
            return Err(HarnessError::NoFixtures { path: path.clone() });
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Reads and parses one fixture document.
pub fn load_group(path: &Path) -> Result<FixtureGroup, HarnessError> {
    tracing::debug!(path = %path.display(), "reading fixture document");
    let content = fs::read_to_string(path).map_err(|source| HarnessError::FixtureIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_group(&group_name(path), &path.display().to_string(), &content, is_yaml(path))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yml" || ext == "yaml")
        .unwrap_or(false)
}

/// Parses fixture document text into a group named `group`.
pub fn parse_group(
    group: &str,
    source_name: &str,
    content: &str,
    yaml: bool,
) -> Result<FixtureGroup, HarnessError> {
    let document: FixtureDocument = if yaml {
        let tree: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
            let offset = e.location().map(|l| l.index()).unwrap_or(0);
            HarnessError::fixture_parse(source_name, content, e.to_string(), offset)
        })?;
        serde_json::from_value(yaml_to_json(tree)).map_err(|e| {
            HarnessError::fixture_parse(source_name, content, e.to_string(), 0)
        })?
    } else {
        serde_json::from_str(content).map_err(|e| {
            let offset = line_column_offset(content, e.line(), e.column());
            HarnessError::fixture_parse(source_name, content, e.to_string(), offset)
        })?
    };

    let cases = document
        .tests
        .into_iter()
        .map(|mut case| {
            case.full_name = full_name(group, &case.name);
            case.override_applied = None;
            case.actual_output = None;
            case.execution_error = None;
            case
        })
        .collect();

    Ok(FixtureGroup {
        name: group.to_string(),
        cases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "overview": "ignored",
        "tests": [
            {
                "name": "Basic",
                "desc": "Plain text passes through.",
                "data": {"planet": "world"},
                "template": "Hello {{planet}}",
                "expected": "Hello world"
            },
            {
                "name": "Partial",
                "data": {},
                "template": "{{>p}}",
                "partials": {"p": "X"},
                "expected": "X"
            }
        ]
    }"#;

    #[test]
    fn group_names_follow_file_names() {
        assert_eq!(group_name(Path::new("specs/interpolation.json")), "Interpolation");
        assert_eq!(group_name(Path::new("specs/~lambdas.json")), "Lambdas");
        assert_eq!(group_name(Path::new("dynamic-names.yml")), "Dynamic-Names");
    }

    #[test]
    fn json_document_loads_cases_in_order() {
        let group = parse_group("Sample", "sample.json", DOCUMENT, false).expect("parses");
        assert_eq!(group.cases.len(), 2);
        assert_eq!(group.cases[0].full_name, "Sample -> Basic");
        assert_eq!(group.cases[0].description, "Plain text passes through.");
        assert!(group.cases[0].partials.is_empty());
        assert_eq!(group.cases[1].partials.get("p").map(String::as_str), Some("X"));
    }

    #[test]
    fn yaml_document_loads_lambdas() {
        let yaml = "\
tests:
  - name: Lambda
    desc: d
    data:
      lambda: !code
        bash: echo -n hi
    template: '{{lambda}}'
    expected: hi
";
        let group = parse_group("Lambdas", "l.yml", yaml, true).expect("parses");
        let data = group.cases[0].data.as_map().expect("map data");
        assert_eq!(data.get("lambda").map(Value::type_name), Some("Lambda"));
    }

    #[test]
    fn run_state_in_the_document_is_ignored() {
        let doc = r#"{"tests": [
            {"name": "n", "template": "", "expected": "", "actualOutput": "x"}
        ]}"#;
        let group = parse_group("G", "g.json", doc, false).expect("parses");
        assert_eq!(group.cases[0].actual_output, None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = parse_group("G", "g.json", "{\"tests\": [", false).expect_err("fails");
        assert!(matches!(err, HarnessError::FixtureParse { .. }));
    }

    #[test]
    fn missing_template_is_an_error() {
        let doc = r#"{"tests": [{"name": "n", "expected": ""}]}"#;
        assert!(parse_group("G", "g.json", doc, false).is_err());
    }
}
