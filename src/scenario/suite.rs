//! YAML scenario suites
//!
//! A suite file lists scenarios in execution order:
//!
//! ```yaml
//! endpoint: https://graphqlzero.almansi.me/api
//! scenarios:
//!   - name: sort albums by title ascending
//!     resource: albums
//!     category: sorting
//!     operation:
//!       field: albums
//!       args: { options: { sort: { field: title, order: { $enum: ASC } } } }
//!       select: [ { data: [id, title] } ]
//!     expect:
//!       - is_sorted: { path: albums.data, field: title, order: asc }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::{debug, warn};

use crate::assertion::{deserialize_expectations, Expectation};
use crate::common::{Error, Result};
use crate::operation::{build, fields, Field, OperationKind, OperationSource, Value};
use crate::transport::SendOptions;

use super::{Capture, Category, Prepared, Scenario, ScenarioRegistry};

/// A loaded suite: its registry plus suite-level settings
#[derive(Debug)]
pub struct Suite {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Endpoint declared by the suite, overriding the config file
    pub endpoint: Option<String>,
    pub registry: ScenarioRegistry,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    name: Option<String>,
    description: Option<String>,
    endpoint: Option<String>,
    scenarios: Vec<ScenarioSpec>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ScenarioSpec {
    name: String,
    description: Option<String>,
    /// Group the scenario belongs to (e.g. "albums")
    resource: String,
    category: Category,
    operation: OperationSpec,
    #[serde(default, deserialize_with = "deserialize_expectations")]
    expect: Vec<Expectation>,
    /// Timeouts and unreachable servers are the expected outcome
    #[serde(default)]
    expect_transport_failure: bool,
    fail_on_status: Option<bool>,
    timeout_secs: Option<u64>,
    endpoint: Option<String>,
    /// Binding name -> path into the response data
    #[serde(default)]
    capture: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct OperationSpec {
    #[serde(default)]
    kind: OperationKind,
    field: Option<String>,
    #[serde(default)]
    args: Mapping,
    #[serde(default)]
    select: Vec<YamlValue>,
    /// Document text sent verbatim
    raw: Option<String>,
}

/// Load a suite from a YAML file
pub fn load_suite(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    parse_suite(&content, &path.display().to_string())
}

/// Parse suite text; `origin` names the source in error messages
pub fn parse_suite(content: &str, origin: &str) -> Result<Suite> {
    let file: SuiteFile =
        serde_yaml::from_str(content).map_err(|e| Error::suite_parse(origin, e))?;

    let mut registry = ScenarioRegistry::new();
    for spec in file.scenarios {
        let scenario = spec.into_scenario();
        if let Prepared::Invalid(reason) = &scenario.operation {
            warn!(
                scenario = %scenario.qualified_name(),
                "Operation cannot be built and will fail: {}", reason
            );
        }
        registry
            .register(scenario)
            .map_err(|e| Error::suite_parse(origin, e))?;
    }

    debug!(scenarios = registry.len(), "Loaded suite {}", origin);

    Ok(Suite {
        name: file.name,
        description: file.description,
        endpoint: file.endpoint,
        registry,
    })
}

impl ScenarioSpec {
    fn into_scenario(self) -> Scenario {
        let prepared = match self.timeout_secs {
            Some(0) => Err(Error::build("timeout_secs must be at least 1")),
            _ => self.operation.prepare(),
        };
        let operation = match prepared {
            Ok(source) => Prepared::Ready(source),
            Err(e) => Prepared::Invalid(e.to_string()),
        };

        Scenario {
            name: self.name,
            resource: self.resource,
            category: self.category,
            description: self.description,
            operation,
            expectations: self.expect,
            expect_transport_failure: self.expect_transport_failure,
            options: SendOptions {
                endpoint: self.endpoint,
                timeout: self.timeout_secs.map(std::time::Duration::from_secs),
                fail_on_status: self.fail_on_status,
            },
            captures: self
                .capture
                .into_iter()
                .map(|(binding, path)| Capture { binding, path })
                .collect(),
        }
    }
}

impl OperationSpec {
    fn prepare(self) -> Result<OperationSource> {
        match (self.raw, self.field) {
            (Some(raw), None) => {
                if !self.args.is_empty() || !self.select.is_empty() {
                    return Err(Error::build("a raw operation takes no args or select"));
                }
                Ok(OperationSource::Raw(raw))
            }
            (None, Some(field)) => {
                let arguments = self
                    .args
                    .iter()
                    .map(|(key, value)| Ok((key_name(key)?, to_value(value)?)))
                    .collect::<Result<Vec<_>>>()?;
                let selection = to_selection(&self.select)?;
                Ok(OperationSource::Built(build(
                    self.kind, &field, arguments, selection,
                )?))
            }
            (Some(_), Some(_)) => Err(Error::build("set either 'raw' or 'field', not both")),
            (None, None) => Err(Error::build("operation needs a 'field' or 'raw' text")),
        }
    }
}

fn key_name(key: &YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        other => Err(Error::build(format!(
            "argument and object keys must be strings, got {:?}",
            other
        ))),
    }
}

/// Convert a YAML argument value into an operation value
///
/// `{ $enum: TOKEN }` is an enum token and `{ $bind: name }` a binding
/// placeholder; any other mapping is an input object.
fn to_value(yaml: &YamlValue) -> Result<Value> {
    match yaml {
        YamlValue::Null => Ok(Value::Null),
        YamlValue::Bool(b) => Ok(Value::Boolean(*b)),
        YamlValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| Error::build(format!("unsupported number {}", n))),
        },
        YamlValue::String(s) => Ok(Value::String(s.clone())),
        YamlValue::Sequence(items) => items
            .iter()
            .map(to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        YamlValue::Mapping(map) => {
            if map.len() == 1 {
                if let Some((key, value)) = map.iter().next() {
                    match key.as_str() {
                        Some("$enum") => return special_string(value, "$enum").map(Value::Enum),
                        Some("$bind") => {
                            return special_string(value, "$bind").map(Value::Binding)
                        }
                        _ => {}
                    }
                }
            }
            map.iter()
                .map(|(key, value)| Ok((key_name(key)?, to_value(value)?)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Object)
        }
        YamlValue::Tagged(tagged) => Err(Error::build(format!(
            "YAML tag {} is not supported in arguments",
            tagged.tag
        ))),
    }
}

fn special_string(value: &YamlValue, marker: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::build(format!("{} takes a string, got {:?}", marker, value)))
}

/// Convert a YAML selection list
///
/// Strings are whitespace-separated leaf fields; a mapping nests each key
/// over its own selection list.
fn to_selection(items: &[YamlValue]) -> Result<Vec<Field>> {
    let mut selection = Vec::new();
    for item in items {
        match item {
            YamlValue::String(names) => selection.extend(fields(names)),
            YamlValue::Mapping(map) => {
                for (key, value) in map {
                    let name = key_name(key)?;
                    let nested = match value {
                        YamlValue::Sequence(inner) => to_selection(inner)?,
                        YamlValue::String(names) => fields(names),
                        YamlValue::Null => Vec::new(),
                        other => {
                            return Err(Error::build(format!(
                                "selection of '{}' must be a list, got {:?}",
                                name, other
                            )))
                        }
                    };
                    if nested.is_empty() {
                        return Err(Error::build(format!(
                            "nested selection of '{}' is empty",
                            name
                        )));
                    }
                    selection.push(Field::nested(name, nested));
                }
            }
            other => {
                return Err(Error::build(format!(
                    "selection entries must be names or mappings, got {:?}",
                    other
                )))
            }
        }
    }
    Ok(selection)
}
