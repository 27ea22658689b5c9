//! Response normalization
//!
//! GraphQL servers disagree on how to report errors: schema-level errors
//! usually come back with HTTP 200, syntax and validation errors often with
//! 400. Normalizing both to `GraphQLErrors` lets expectations ask "did an
//! error occur" without knowing the server's status convention.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::transport::{Body, RawResponse};

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ErrorLocation>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// The classified outcome of one request; exactly one variant applies
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NormalizedResult {
    Success {
        status: u16,
        data: JsonValue,
    },
    GraphqlErrors {
        status: u16,
        errors: Vec<GraphqlError>,
        /// Partial data sent alongside the errors, if any
        data: Option<JsonValue>,
    },
    TransportError {
        status: u16,
        body: Body,
    },
}

/// Coarse outcome, used by `outcomeIs` and in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    GraphqlErrors,
    TransportError,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutcomeKind::Success => "success",
            OutcomeKind::GraphqlErrors => "graphql_errors",
            OutcomeKind::TransportError => "transport_error",
        })
    }
}

impl NormalizedResult {
    pub fn status(&self) -> u16 {
        match self {
            NormalizedResult::Success { status, .. }
            | NormalizedResult::GraphqlErrors { status, .. }
            | NormalizedResult::TransportError { status, .. } => *status,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            NormalizedResult::Success { .. } => OutcomeKind::Success,
            NormalizedResult::GraphqlErrors { .. } => OutcomeKind::GraphqlErrors,
            NormalizedResult::TransportError { .. } => OutcomeKind::TransportError,
        }
    }

    /// Data to evaluate field predicates against, including partial data
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            NormalizedResult::Success { data, .. } => Some(data),
            NormalizedResult::GraphqlErrors { data, .. } => data.as_ref(),
            NormalizedResult::TransportError { .. } => None,
        }
    }

    pub fn errors(&self) -> Option<&[GraphqlError]> {
        match self {
            NormalizedResult::GraphqlErrors { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// One-line description for diagnostics
    pub fn summary(&self) -> String {
        match self {
            NormalizedResult::Success { status, .. } => format!("success (status {})", status),
            NormalizedResult::GraphqlErrors { status, errors, .. } => {
                let first = errors.first().map(|e| e.message.as_str()).unwrap_or("");
                format!(
                    "{} GraphQL error(s) (status {}): {}",
                    errors.len(),
                    status,
                    first
                )
            }
            NormalizedResult::TransportError { status, body } => {
                let text = body.to_text();
                if text.is_empty() {
                    format!("transport error (status {})", status)
                } else {
                    format!("transport error (status {}): {}", status, truncate(&text, 200))
                }
            }
        }
    }
}

/// Classify a raw response
pub fn normalize(response: RawResponse) -> NormalizedResult {
    let RawResponse { status, body } = response;

    let json = match body {
        Body::Json(json) => json,
        other => return NormalizedResult::TransportError { status, body: other },
    };

    if let Some(errors) = json.get("errors").and_then(JsonValue::as_array) {
        if !errors.is_empty() {
            let data = json.get("data").filter(|d| !d.is_null()).cloned();
            return NormalizedResult::GraphqlErrors {
                status,
                errors: errors.iter().map(parse_error).collect(),
                data,
            };
        }
    }

    if (200..300).contains(&status) {
        let data = json.get("data").cloned().unwrap_or(JsonValue::Null);
        NormalizedResult::Success { status, data }
    } else {
        NormalizedResult::TransportError {
            status,
            body: Body::Json(json),
        }
    }
}

fn parse_error(entry: &JsonValue) -> GraphqlError {
    serde_json::from_value(entry.clone()).unwrap_or_else(|_| GraphqlError {
        message: entry
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.to_string()),
        path: None,
        locations: None,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response(status: u16, body: JsonValue) -> RawResponse {
        RawResponse::new(status, Body::Json(body))
    }

    #[test]
    fn test_success() {
        let result = normalize(json_response(
            200,
            json!({"data": {"album": {"title": "quidem molestiae enim"}}}),
        ));
        assert_eq!(result.kind(), OutcomeKind::Success);
        assert_eq!(result.data().unwrap()["album"]["title"], "quidem molestiae enim");
    }

    #[test]
    fn test_errors_take_precedence_over_data() {
        let result = normalize(json_response(
            200,
            json!({
                "data": {"album": null},
                "errors": [{"message": "boom", "path": ["album"]}]
            }),
        ));
        assert_eq!(result.kind(), OutcomeKind::GraphqlErrors);
        assert_eq!(result.errors().unwrap()[0].message, "boom");
        assert_eq!(
            result.errors().unwrap()[0].path,
            Some(vec![json!("album")])
        );
    }

    #[test]
    fn test_partial_data_is_kept() {
        let result = normalize(json_response(
            200,
            json!({
                "data": {"user": {"name": "Leanne Graham"}},
                "errors": [{"message": "albums failed"}]
            }),
        ));
        assert_eq!(result.data().unwrap()["user"]["name"], "Leanne Graham");
    }

    #[test]
    fn test_400_with_errors_is_graphql_errors() {
        let result = normalize(json_response(
            400,
            json!({"errors": [{
                "message": "Syntax Error: Expected Name, found <EOF>.",
                "locations": [{"line": 5, "column": 9}]
            }]}),
        ));
        assert_eq!(result.kind(), OutcomeKind::GraphqlErrors);
        assert_eq!(result.status(), 400);
        let error = &result.errors().unwrap()[0];
        assert!(error.message.contains("Syntax Error"));
        assert_eq!(
            error.locations.as_deref(),
            Some(&[ErrorLocation { line: 5, column: 9 }][..])
        );
    }

    #[test]
    fn test_empty_errors_array_is_not_an_error() {
        let result = normalize(json_response(200, json!({"data": {"ok": true}, "errors": []})));
        assert_eq!(result.kind(), OutcomeKind::Success);
    }

    #[test]
    fn test_non_json_body() {
        let result = normalize(RawResponse::new(502, Body::Text("Bad Gateway".to_string())));
        match result {
            NormalizedResult::TransportError { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, Body::Text("Bad Gateway".to_string()));
            }
            other => panic!("Expected TransportError, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_is_transport_error() {
        let result = normalize(RawResponse::timed_out());
        assert_eq!(result.kind(), OutcomeKind::TransportError);
        assert_eq!(result.status(), 0);
    }

    #[test]
    fn test_json_error_status_without_errors() {
        let result = normalize(json_response(500, json!({"message": "internal"})));
        assert_eq!(result.kind(), OutcomeKind::TransportError);
        assert!(result.data().is_none());
    }

    #[test]
    fn test_malformed_error_entries_keep_their_text() {
        let result = normalize(json_response(200, json!({"errors": [{"code": 7}, "plain"]})));
        let errors = result.errors().unwrap();
        assert_eq!(errors[0].message, r#"{"code":7}"#);
        assert_eq!(errors[1].message, r#""plain""#);
    }

    #[test]
    fn test_summary_truncates_long_bodies() {
        let long = "x".repeat(500);
        let summary = normalize(RawResponse::new(503, Body::Text(long))).summary();
        assert!(summary.len() < 260);
        assert!(summary.ends_with("..."));
    }
}
