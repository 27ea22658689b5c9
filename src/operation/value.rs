//! Argument values and their GraphQL literal rendering

use std::collections::HashMap;
use std::fmt::Write;

use serde_json::Value as JsonValue;

use crate::common::{Error, Result};

use super::is_name;

/// Values captured from earlier scenarios, keyed by binding name
pub type Bindings = HashMap<String, JsonValue>;

/// A literal argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Null,
    /// Bare enum token such as `ASC`
    Enum(String),
    List(Vec<Value>),
    /// Input object; keys keep declaration order
    Object(Vec<(String, Value)>),
    /// Placeholder filled from a prior scenario's captured value
    Binding(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn enum_token(s: impl Into<String>) -> Self {
        Value::Enum(s.into())
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Check the syntactic shape of this value (names, finite floats)
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Value::Float(f) if !f.is_finite() => {
                Err(Error::build(format!("float argument {} is not finite", f)))
            }
            Value::Enum(token) => {
                if !is_name(token) {
                    return Err(Error::build(format!(
                        "enum token '{}' is not a valid GraphQL name",
                        token
                    )));
                }
                if matches!(token.as_str(), "true" | "false" | "null") {
                    return Err(Error::build(format!(
                        "'{}' cannot be used as an enum token",
                        token
                    )));
                }
                Ok(())
            }
            Value::List(items) => items.iter().try_for_each(Value::validate),
            Value::Object(entries) => {
                for (key, value) in entries {
                    if !is_name(key) {
                        return Err(Error::build(format!(
                            "input object key '{}' is not a valid GraphQL name",
                            key
                        )));
                    }
                    value.validate()?;
                }
                Ok(())
            }
            Value::Binding(name) if name.is_empty() => {
                Err(Error::build("binding name cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Collect binding names referenced anywhere in this value
    pub(crate) fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Binding(name) => out.push(name),
            Value::List(items) => items.iter().for_each(|v| v.collect_bindings(out)),
            Value::Object(entries) => entries.iter().for_each(|(_, v)| v.collect_bindings(out)),
            _ => {}
        }
    }

    /// Append the GraphQL literal form of this value to `out`
    pub(crate) fn write_literal(&self, out: &mut String, bindings: &Bindings) -> Result<()> {
        match self {
            Value::String(s) => out.push_str(&quote(s)),
            Value::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Null => out.push_str("null"),
            Value::Enum(token) => out.push_str(token),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_literal(out, bindings)?;
                }
                out.push(']');
            }
            Value::Object(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return Ok(());
                }
                out.push_str("{ ");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.write_literal(out, bindings)?;
                }
                out.push_str(" }");
            }
            Value::Binding(name) => {
                let captured = bindings
                    .get(name)
                    .ok_or_else(|| Error::UnresolvedBinding(name.clone()))?;
                let resolved = Value::from_json(captured)?;
                resolved.validate()?;
                resolved.write_literal(out, bindings)?;
            }
        }
        Ok(())
    }

    /// Convert a captured JSON value into an argument value
    pub fn from_json(json: &JsonValue) -> Result<Value> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect::<Result<_>>()?)
            }
            JsonValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// Quote a string as a GraphQL string literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn format_float(f: f64) -> String {
    // Integral values need a fraction or an exponent, or the server reads an Int
    if f.fract() != 0.0 {
        format!("{}", f)
    } else if f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{:e}", f)
    }
}
