//! GraphQL-over-HTTP transport
//!
//! Every operation is a POST of `{"query": "..."}`. Non-2xx answers are
//! handed back like any other response because negative scenarios need to
//! inspect 400-level bodies; only a per-call `fail_on_status` turns them
//! into errors.

mod http;

pub use http::HttpTransport;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::common::Result;

/// Status reported when no HTTP response was received (timeout, refused)
pub const NO_STATUS: u16 = 0;

/// Response body as received
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Body {
    Json(JsonValue),
    /// Not valid JSON; kept verbatim
    Text(String),
    Empty,
}

impl Body {
    /// Classify raw response bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Body::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(json) => Body::Json(json),
            Err(_) => Body::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Body as display text, for diagnostics
    pub fn to_text(&self) -> String {
        match self {
            Body::Json(json) => json.to_string(),
            Body::Text(text) => text.clone(),
            Body::Empty => String::new(),
        }
    }
}

/// A fully buffered HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Body,
}

impl RawResponse {
    pub fn new(status: u16, body: Body) -> Self {
        Self { status, body }
    }

    /// The request did not complete within its timeout
    pub fn timed_out() -> Self {
        Self {
            status: NO_STATUS,
            body: Body::Empty,
        }
    }

    /// The server could not be reached at all
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: NO_STATUS,
            body: Body::Text(reason.into()),
        }
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-call overrides of the client defaults
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Send to this endpoint instead of the run's endpoint
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
    /// Return `Error::UnexpectedStatus` for non-2xx instead of the response
    pub fail_on_status: Option<bool>,
}

/// Sends one GraphQL document and buffers the answer
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        operation: &str,
        options: &SendOptions,
    ) -> Result<RawResponse>;
}

/// The JSON envelope for queries and mutations alike
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub query: &'a str,
}
