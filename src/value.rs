//! The fixture value model.
//!
//! Fixture documents are untyped JSON or YAML. Every value is converted once,
//! at load time, into the closed [`Value`] union so that the rest of the
//! harness matches exhaustively instead of probing shapes at runtime.

use im::OrdMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::BTreeMap;

/// Map key carrying the callable tag on a lambda object.
pub const LAMBDA_TAG_KEY: &str = "__tag__";
/// Value of [`LAMBDA_TAG_KEY`] that marks a lambda.
pub const LAMBDA_TAG: &str = "code";
/// Body key holding the shell dialect source of a lambda.
pub const SHELL_BODY_KEY: &str = "bash";
/// Older fixture corpora marked lambdas only by carrying all of these bodies.
pub const LEGACY_LAMBDA_KEYS: [&str; 5] = ["js", "perl", "php", "python", "ruby"];

/// A single fixture value.
///
/// # Examples
///
/// ```rust
/// use spec_runner::value::Value;
/// let v = Value::from(serde_json::json!({"__tag__": "code", "bash": "echo hi"}));
/// assert_eq!(v.type_name(), "Lambda");
/// let m = Value::from(serde_json::json!({"a": 1}));
/// assert_eq!(m.type_name(), "Map");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Number(Number),
    Bool(bool),
    Sequence(Vec<Value>),
    Map(OrdMap<String, Value>),
    Lambda(Lambda),
}

/// A callable fixture value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lambda {
    /// Shell dialect body, used verbatim as a function body.
    pub shell: Option<String>,
    /// Bodies for other languages, keyed by language name.
    pub alternates: BTreeMap<String, String>,
}

impl Lambda {
    /// Creates a lambda with only a shell body.
    pub fn shell(body: impl Into<String>) -> Self {
        Self {
            shell: Some(body.into()),
            alternates: BTreeMap::new(),
        }
    }

    pub fn alternate(&self, language: &str) -> Option<&str> {
        self.alternates.get(language).map(String::as_str)
    }

    fn from_object(object: JsonMap<String, Json>) -> Self {
        let mut lambda = Lambda::default();
        for (key, body) in object {
            if key == LAMBDA_TAG_KEY {
                continue;
            }
            let Json::String(body) = body else {
                continue;
            };
            if key == SHELL_BODY_KEY {
                lambda.shell = Some(body);
            } else {
                lambda.alternates.insert(key, body);
            }
        }
        lambda
    }

    fn to_json(&self) -> Json {
        let mut object = JsonMap::new();
        object.insert(LAMBDA_TAG_KEY.to_string(), Json::from(LAMBDA_TAG));
        if let Some(shell) = &self.shell {
            object.insert(SHELL_BODY_KEY.to_string(), Json::from(shell.as_str()));
        }
        for (language, body) in &self.alternates {
            object.insert(language.clone(), Json::from(body.as_str()));
        }
        Json::Object(object)
    }
}

impl Value {
    /// Returns the variant name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::String(_) => "String",
            Value::Number(_) => "Number",
            Value::Bool(_) => "Bool",
            Value::Sequence(_) => "Sequence",
            Value::Map(_) => "Map",
            Value::Lambda(_) => "Lambda",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the shapes that a shell scalar cannot hold.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Map(_) | Value::Lambda(_))
    }

    pub fn as_map(&self) -> Option<&OrdMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Converts back into plain JSON, lambdas included, for failure dumps.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::String(s) => Json::String(s.clone()),
            Value::Number(n) => Json::Number(n.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Sequence(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Lambda(lambda) => lambda.to_json(),
        }
    }
}

fn is_lambda_object(object: &JsonMap<String, Json>) -> bool {
    if let Some(tag) = object.get(LAMBDA_TAG_KEY) {
        return tag.as_str() == Some(LAMBDA_TAG);
    }
    LEGACY_LAMBDA_KEYS
        .iter()
        .all(|key| object.get(*key).is_some_and(Json::is_string))
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Sequence(items.into_iter().map(Value::from).collect()),
            Json::Object(object) if is_lambda_object(&object) => {
                Value::Lambda(Lambda::from_object(object))
            }
            Json::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Lambda> for Value {
    fn from(lambda: Lambda) -> Self {
        Value::Lambda(lambda)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Json::deserialize(deserializer).map(Value::from)
    }
}

/// Converts a YAML document tree into JSON.
///
/// The only YAML tag the fixture corpus uses is `!code`, which marks a
/// lambda; it becomes the `__tag__: code` key of the JSON representation.
/// Other tags are dropped and their inner value kept.
pub fn yaml_to_json(yaml: serde_yaml::Value) -> Json {
    use serde_yaml::Value as Yaml;
    match yaml {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => Json::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { tag, value } = *tagged;
            let is_code = tag == LAMBDA_TAG;
            let mut inner = yaml_to_json(value);
            if is_code {
                if let Json::Object(object) = &mut inner {
                    object.insert(LAMBDA_TAG_KEY.to_string(), Json::from(LAMBDA_TAG));
                }
            }
            inner
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Json {
    if let Some(i) = n.as_i64() {
        Json::from(i)
    } else if let Some(u) = n.as_u64() {
        Json::from(u)
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map_or(Json::Null, Json::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
