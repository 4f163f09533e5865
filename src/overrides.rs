//! Declarative per-case overrides.
//!
//! An override table maps a case's full name to an [`OverridePatch`]. Patches
//! replace whole fields, never merge, and every replaced field's previous
//! value is kept in the case's [`AppliedOverride`] audit record so that the
//! original expectation stays visible in failure dumps.
//!
//! Entries naming cases that are not loaded are simply never looked up.

use crate::error::HarnessError;
use crate::fixture::Case;
use crate::value::{yaml_to_json, Value};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The override table maintained alongside the harness for bash engines.
const BUILTIN_TABLE: &str = include_str!("../overrides/bash.yaml");

/// A partial replacement of a case's declarative fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverridePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partials: Option<OrdMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

/// A case field an override can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Data,
    Template,
    Expected,
    Partials,
    Skip,
}

/// Audit record left on a case once an override replaced its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Replaced fields, in application order.
    pub fields: Vec<Field>,
    /// Values of the replaced fields before the override.
    pub before: OverridePatch,
}

impl OverridePatch {
    /// Replaces every field this patch names and returns the audit record.
    fn apply(&self, case: &mut Case) -> AppliedOverride {
        let mut fields = Vec::new();
        let mut before = OverridePatch::default();

        if let Some(data) = &self.data {
            before.data = Some(std::mem::replace(&mut case.data, data.clone()));
            fields.push(Field::Data);
        }
        if let Some(template) = &self.template {
            before.template = Some(std::mem::replace(&mut case.template, template.clone()));
            fields.push(Field::Template);
        }
        if let Some(expected) = &self.expected {
            before.expected = Some(std::mem::replace(&mut case.expected, expected.clone()));
            fields.push(Field::Expected);
        }
        if let Some(partials) = &self.partials {
            before.partials = Some(std::mem::replace(&mut case.partials, partials.clone()));
            fields.push(Field::Partials);
        }
        if let Some(skip) = &self.skip {
            before.skip = case.skip.replace(skip.clone());
            fields.push(Field::Skip);
        }

        AppliedOverride {
            reason: self.reason.clone(),
            fields,
            before,
        }
    }
}

/// Full case name to patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: BTreeMap<String, OverridePatch>,
}

impl OverrideTable {
    /// A table that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the harness.
    pub fn builtin() -> Result<Self, HarnessError> {
        Self::from_yaml("overrides/bash.yaml", BUILTIN_TABLE)
    }

    /// Reads a table from a YAML file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path).map_err(|source| HarnessError::OverrideIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&path.display().to_string(), &content)
    }

    /// Parses a table from YAML text. An empty document is an empty table.
    pub fn from_yaml(source_name: &str, content: &str) -> Result<Self, HarnessError> {
        let tree: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
            let offset = e.location().map(|l| l.index()).unwrap_or(0);
            HarnessError::override_parse(source_name, content, e.to_string(), offset)
        })?;
        if tree.is_null() {
            return Ok(Self::empty());
        }
        let entries = serde_json::from_value(yaml_to_json(tree)).map_err(|e| {
            HarnessError::override_parse(source_name, content, e.to_string(), 0)
        })?;
        Ok(Self { entries })
    }

    pub fn insert(&mut self, full_name: impl Into<String>, patch: OverridePatch) {
        self.entries.insert(full_name.into(), patch);
    }

    pub fn get(&self, full_name: &str) -> Option<&OverridePatch> {
        self.entries.get(full_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the patch registered for the case's full name, if any.
    pub fn resolve(&self, mut case: Case) -> Case {
        if let Some(patch) = self.get(&case.full_name) {
            tracing::debug!(case = %case.full_name, "applying override");
            case.override_applied = Some(patch.apply(&mut case));
        }
        case
    }
}
