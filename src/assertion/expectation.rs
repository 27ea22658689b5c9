//! Expectation types
//!
//! Expectations deserialize from suite files in externally tagged form:
//!
//! ```yaml
//! - status_equals: 200
//! - array_length_equals: { path: albums.data, length: 5 }
//! - is_sorted: { path: users.data, field: name, order: asc }
//! - error_message_includes: "Syntax Error"
//! ```
//!
//! serde_yaml reads externally tagged variants only from `!tag` syntax, so
//! suite files go through [`deserialize_expectations`], which accepts the
//! single-key map form at every nesting level.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::normalize::OutcomeKind;

/// A declarative assertion against a normalized result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    StatusEquals(u16),
    FieldEquals {
        path: String,
        value: JsonValue,
    },
    /// A page of exactly `length` items; `last_page` accepts a short page
    ArrayLengthEquals {
        path: String,
        length: usize,
        #[serde(default)]
        last_page: bool,
    },
    ArrayNonEmpty(String),
    IsSorted {
        path: String,
        field: String,
        order: SortOrder,
    },
    /// Every element of the array at `path` satisfies `predicate`; paths
    /// inside the predicate are relative to the element
    AllMatch {
        path: String,
        predicate: Box<Expectation>,
    },
    /// The values at `paths`, concatenated, contain `value`
    ContainsSubstring {
        #[serde(alias = "path")]
        paths: PathList,
        value: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    IsNull(String),
    IsNotNull(String),
    TypeIs {
        path: String,
        kind: JsonKind,
    },
    ErrorMessageIncludes(ErrorMessageCheck),
    OutcomeIs(OutcomeKind),
    All(Vec<Expectation>),
}

impl Expectation {
    /// Predicate name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Expectation::StatusEquals(_) => "statusEquals",
            Expectation::FieldEquals { .. } => "fieldEquals",
            Expectation::ArrayLengthEquals { .. } => "arrayLengthEquals",
            Expectation::ArrayNonEmpty(_) => "arrayNonEmpty",
            Expectation::IsSorted { .. } => "isSorted",
            Expectation::AllMatch { .. } => "allMatch",
            Expectation::ContainsSubstring { .. } => "containsSubstring",
            Expectation::IsNull(_) => "isNull",
            Expectation::IsNotNull(_) => "isNotNull",
            Expectation::TypeIs { .. } => "typeIs",
            Expectation::ErrorMessageIncludes(_) => "errorMessageIncludes",
            Expectation::OutcomeIs(_) => "outcomeIs",
            Expectation::All(_) => "all",
        }
    }

    /// Whether this expectation anticipates server-reported GraphQL errors
    pub fn expects_errors(&self) -> bool {
        match self {
            Expectation::ErrorMessageIncludes(_) => true,
            Expectation::OutcomeIs(kind) => *kind == OutcomeKind::GraphqlErrors,
            Expectation::All(items) => items.iter().any(Expectation::expects_errors),
            _ => false,
        }
    }

    /// Whether this expectation reads the response rather than the data
    pub(crate) fn is_response_level(&self) -> bool {
        matches!(
            self,
            Expectation::StatusEquals(_)
                | Expectation::ErrorMessageIncludes(_)
                | Expectation::OutcomeIs(_)
        )
    }
}

/// Sort direction for `isSorted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        })
    }
}

/// JSON value kinds for `typeIs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl JsonKind {
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(_) => JsonKind::Object,
            JsonValue::Array(_) => JsonKind::Array,
            JsonValue::String(_) => JsonKind::String,
            JsonValue::Number(_) => JsonKind::Number,
            JsonValue::Bool(_) => JsonKind::Boolean,
            JsonValue::Null => JsonKind::Null,
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Null => "null",
        })
    }
}

/// One path or several; a single string is accepted in suites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct PathList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for PathList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(path) => PathList(vec![path]),
            OneOrMany::Many(paths) => PathList(paths),
        }
    }
}

/// `errorMessageIncludes` arguments; a bare string means index 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ErrorMessageSpec")]
pub struct ErrorMessageCheck {
    pub substring: String,
    pub index: usize,
}

impl ErrorMessageCheck {
    pub fn first(substring: impl Into<String>) -> Self {
        Self {
            substring: substring.into(),
            index: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorMessageSpec {
    Substring(String),
    Detailed {
        substring: String,
        #[serde(default)]
        index: usize,
    },
}

impl From<ErrorMessageSpec> for ErrorMessageCheck {
    fn from(spec: ErrorMessageSpec) -> Self {
        match spec {
            ErrorMessageSpec::Substring(substring) => Self {
                substring,
                index: 0,
            },
            ErrorMessageSpec::Detailed { substring, index } => Self { substring, index },
        }
    }
}

/// Deserialize `- name: argument` entries, including nested predicates
pub(crate) fn deserialize_expectations<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<Expectation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_yaml::with::singleton_map_recursive::deserialize(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_list(yaml: &str) -> serde_yaml::Result<Vec<Expectation>> {
        deserialize_expectations(serde_yaml::Deserializer::from_str(yaml))
    }

    #[test]
    fn test_parse_expectation_list() {
        let yaml = r#"
- status_equals: 200
- array_length_equals: { path: albums.data, length: 5 }
- is_sorted: { path: users.data, field: name, order: ASC }
- error_message_includes: "Syntax Error"
- error_message_includes: { substring: "boom", index: 1 }
- contains_substring: { path: title, value: dolores }
- is_null: album.title
- outcome_is: graphql_errors
"#;
        let list = parse_list(yaml).unwrap();
        assert_eq!(list.len(), 8);
        assert_eq!(list[0], Expectation::StatusEquals(200));
        assert_eq!(
            list[1],
            Expectation::ArrayLengthEquals {
                path: "albums.data".to_string(),
                length: 5,
                last_page: false,
            }
        );
        assert!(matches!(
            list[2],
            Expectation::IsSorted {
                order: SortOrder::Asc,
                ..
            }
        ));
        assert_eq!(
            list[3],
            Expectation::ErrorMessageIncludes(ErrorMessageCheck::first("Syntax Error"))
        );
        assert_eq!(
            list[4],
            Expectation::ErrorMessageIncludes(ErrorMessageCheck {
                substring: "boom".to_string(),
                index: 1
            })
        );
        match &list[5] {
            Expectation::ContainsSubstring { paths, .. } => {
                assert_eq!(paths.0, vec!["title".to_string()])
            }
            other => panic!("Expected ContainsSubstring, got {:?}", other),
        }
        assert_eq!(list[7], Expectation::OutcomeIs(OutcomeKind::GraphqlErrors));
    }

    #[test]
    fn test_nested_all_match() {
        let yaml = r#"
- all_match:
    path: users.data
    predicate:
      contains_substring: { paths: [name, email, username], value: Leanne }
- all:
    - status_equals: 200
    - is_not_null: users.data
"#;
        let mut list = parse_list(yaml).unwrap();
        assert_eq!(
            list.pop(),
            Some(Expectation::All(vec![
                Expectation::StatusEquals(200),
                Expectation::IsNotNull("users.data".to_string()),
            ]))
        );
        match list.remove(0) {
            Expectation::AllMatch { path, predicate } => {
                assert_eq!(path, "users.data");
                assert_eq!(predicate.name(), "containsSubstring");
            }
            other => panic!("Expected AllMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_expects_errors() {
        assert!(Expectation::ErrorMessageIncludes(ErrorMessageCheck::first("x")).expects_errors());
        assert!(Expectation::OutcomeIs(OutcomeKind::GraphqlErrors).expects_errors());
        assert!(!Expectation::OutcomeIs(OutcomeKind::Success).expects_errors());
        assert!(Expectation::All(vec![
            Expectation::StatusEquals(400),
            Expectation::OutcomeIs(OutcomeKind::GraphqlErrors)
        ])
        .expects_errors());
        assert!(!Expectation::StatusEquals(400).expects_errors());
    }
}
