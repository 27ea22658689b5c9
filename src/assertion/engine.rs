//! Expectation evaluation
//!
//! Pure functions over a `NormalizedResult`. Evaluation stops at the first
//! failing leaf, and the failure detail names that predicate together with
//! the actual and expected values.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::normalize::{NormalizedResult, OutcomeKind};

use super::expectation::{Expectation, JsonKind, SortOrder};
use super::Verdict;

type Check = std::result::Result<(), String>;

/// Evaluate one expectation
pub fn evaluate(result: &NormalizedResult, expectation: &Expectation) -> Verdict {
    match check(result, expectation) {
        Ok(()) => Verdict::Pass,
        Err(detail) => Verdict::Fail(detail),
    }
}

/// Evaluate expectations left to right, stopping at the first failure
pub fn evaluate_all(result: &NormalizedResult, expectations: &[Expectation]) -> Verdict {
    for expectation in expectations {
        if let Err(detail) = check(result, expectation) {
            return Verdict::Fail(detail);
        }
    }
    Verdict::Pass
}

/// Gate on the response outcome, then evaluate the expectations
///
/// A transport failure fails the scenario unless `expect_transport_failure`
/// is set. GraphQL errors fail it unless some expectation anticipates them.
pub fn evaluate_scenario(
    result: &NormalizedResult,
    expectations: &[Expectation],
    expect_transport_failure: bool,
) -> Verdict {
    match result.kind() {
        OutcomeKind::TransportError if !expect_transport_failure => {
            return Verdict::Fail(format!("unexpected {}", result.summary()));
        }
        OutcomeKind::GraphqlErrors if !expectations.iter().any(Expectation::expects_errors) => {
            return Verdict::Fail(format!("unexpected {}", result.summary()));
        }
        _ => {}
    }
    evaluate_all(result, expectations)
}

fn check(result: &NormalizedResult, expectation: &Expectation) -> Check {
    match expectation {
        Expectation::StatusEquals(expected) => {
            let actual = result.status();
            if actual != *expected {
                return Err(format!(
                    "statusEquals: expected {}, got {} ({})",
                    expected,
                    actual,
                    result.summary()
                ));
            }
            Ok(())
        }
        Expectation::OutcomeIs(expected) => {
            if result.kind() != *expected {
                return Err(format!(
                    "outcomeIs: expected {}, got {}",
                    expected,
                    result.summary()
                ));
            }
            Ok(())
        }
        Expectation::ErrorMessageIncludes(check) => {
            let errors = result.errors().ok_or_else(|| {
                format!(
                    "errorMessageIncludes: expected GraphQL errors, got {}",
                    result.summary()
                )
            })?;
            let error = errors.get(check.index).ok_or_else(|| {
                format!(
                    "errorMessageIncludes: no error at index {} (only {})",
                    check.index,
                    errors.len()
                )
            })?;
            if !error.message.contains(&check.substring) {
                return Err(format!(
                    "errorMessageIncludes: expected errors[{}].message to include '{}', got '{}'",
                    check.index, check.substring, error.message
                ));
            }
            Ok(())
        }
        Expectation::All(items) => items.iter().try_for_each(|item| check(result, item)),
        data_level => {
            let data = result.data().ok_or_else(|| {
                format!(
                    "{}: no data to inspect, response was {}",
                    data_level.name(),
                    result.summary()
                )
            })?;
            check_value(data, data_level)
        }
    }
}

/// Evaluate a data-level expectation against a JSON root
fn check_value(root: &JsonValue, expectation: &Expectation) -> Check {
    match expectation {
        Expectation::FieldEquals { path, value } => {
            let actual = require(root, path, "fieldEquals")?;
            if actual != value {
                return Err(format!(
                    "fieldEquals({}): expected {}, got {}",
                    path, value, actual
                ));
            }
            Ok(())
        }
        Expectation::ArrayLengthEquals {
            path,
            length,
            last_page,
        } => {
            let items = require_array(root, path, "arrayLengthEquals")?;
            let actual = items.len();
            if actual > *length {
                return Err(format!(
                    "arrayLengthEquals({}): expected {}, got {}",
                    path, length, actual
                ));
            }
            if actual < *length && !last_page {
                return Err(format!(
                    "arrayLengthEquals({}): expected {}, got {} (short page; set last_page if this is the final page)",
                    path, length, actual
                ));
            }
            Ok(())
        }
        Expectation::ArrayNonEmpty(path) => {
            let items = require_array(root, path, "arrayNonEmpty")?;
            if items.is_empty() {
                return Err(format!("arrayNonEmpty({}): array is empty", path));
            }
            Ok(())
        }
        Expectation::IsSorted { path, field, order } => check_sorted(root, path, field, *order),
        Expectation::AllMatch { path, predicate } => {
            let items = require_array(root, path, "allMatch")?;
            for (index, item) in items.iter().enumerate() {
                check_value(item, predicate).map_err(|detail| {
                    format!("allMatch({}): element {} failed: {}", path, index, detail)
                })?;
            }
            Ok(())
        }
        Expectation::ContainsSubstring {
            paths,
            value,
            case_insensitive,
        } => {
            let mut haystack = String::new();
            let mut found_any = false;
            for path in &paths.0 {
                match lookup(root, path) {
                    Some(JsonValue::String(s)) => {
                        haystack.push_str(s);
                        found_any = true;
                    }
                    Some(JsonValue::Number(n)) => {
                        haystack.push_str(&n.to_string());
                        found_any = true;
                    }
                    Some(JsonValue::Bool(b)) => {
                        haystack.push_str(if *b { "true" } else { "false" });
                        found_any = true;
                    }
                    _ => {}
                }
            }
            let joined = paths.0.join(" + ");
            if !found_any {
                return Err(format!(
                    "containsSubstring({}): no string value found",
                    joined
                ));
            }
            let matches = if *case_insensitive {
                haystack.to_lowercase().contains(&value.to_lowercase())
            } else {
                haystack.contains(value.as_str())
            };
            if !matches {
                return Err(format!(
                    "containsSubstring({}): expected to include '{}', got '{}'",
                    joined, value, haystack
                ));
            }
            Ok(())
        }
        Expectation::IsNull(path) => {
            let actual = require(root, path, "isNull")?;
            if !actual.is_null() {
                return Err(format!("isNull({}): expected null, got {}", path, actual));
            }
            Ok(())
        }
        Expectation::IsNotNull(path) => {
            let actual = require(root, path, "isNotNull")?;
            if actual.is_null() {
                return Err(format!("isNotNull({}): value is null", path));
            }
            Ok(())
        }
        Expectation::TypeIs { path, kind } => {
            let actual = require(root, path, "typeIs")?;
            let actual_kind = JsonKind::of(actual);
            if actual_kind != *kind {
                return Err(format!(
                    "typeIs({}): expected {}, got {} ({})",
                    path, kind, actual_kind, actual
                ));
            }
            Ok(())
        }
        Expectation::All(items) => items.iter().try_for_each(|item| check_value(root, item)),
        response_level => {
            debug_assert!(response_level.is_response_level());
            Err(format!(
                "{} cannot be applied to an array element",
                response_level.name()
            ))
        }
    }
}

fn check_sorted(root: &JsonValue, path: &str, field: &str, order: SortOrder) -> Check {
    let items = require_array(root, path, "isSorted")?;
    let mut extracted = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let value = lookup(item, field).ok_or_else(|| {
            format!(
                "isSorted({}, {}): element {} has no field '{}'",
                path, field, index, field
            )
        })?;
        extracted.push(value);
    }

    let mut expected = extracted.clone();
    // Vec::sort_by is stable, so ties keep their order across runs
    expected.sort_by(|a, b| compare_values(a, b));
    if order == SortOrder::Desc {
        expected.reverse();
    }

    if let Some(index) = extracted
        .iter()
        .zip(expected.iter())
        .position(|(actual, wanted)| compare_values(actual, wanted) != Ordering::Equal)
    {
        return Err(format!(
            "isSorted({}, {}, {}): order breaks at index {}: expected {}, got {}",
            path, field, order, index, expected[index], extracted[index]
        ));
    }
    Ok(())
}

/// Total order over JSON scalars: null < booleans < numbers < strings
///
/// Strings compare by code point, numbers numerically. Arrays and objects
/// sort last, by their serialized text.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn rank(value: &JsonValue) -> u8 {
        match value {
            JsonValue::Null => 0,
            JsonValue::Bool(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
        }
    }

    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .unwrap_or_default()
                    .partial_cmp(&y.as_f64().unwrap_or_default())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(_), JsonValue::Array(_))
        | (JsonValue::Object(_), JsonValue::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Resolve a dot-separated path; numeric segments index arrays
///
/// An empty path (or `.`) is the root itself.
pub fn lookup<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.trim();
    if path.is_empty() || path == "." {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn require<'a>(root: &'a JsonValue, path: &str, predicate: &str) -> Result<&'a JsonValue, String> {
    lookup(root, path).ok_or_else(|| format!("{}({}): path not found", predicate, path))
}

fn require_array<'a>(
    root: &'a JsonValue,
    path: &str,
    predicate: &str,
) -> Result<&'a Vec<JsonValue>, String> {
    let value = require(root, path, predicate)?;
    value.as_array().ok_or_else(|| {
        format!(
            "{}({}): expected an array, got {}",
            predicate,
            path,
            JsonKind::of(value)
        )
    })
}
