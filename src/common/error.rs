//! Error types for gqlcheck
//!
//! Registry and configuration errors abort a run before any request is sent.
//! Per-scenario problems (build errors, transport failures, failed
//! expectations) are recorded in the scenario's verdict instead.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gqlcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Operation Build Errors ===
    #[error("Invalid operation: {0}")]
    Build(String),

    #[error("Binding '{0}' has no value. Capture it in an earlier scenario with 'capture'")]
    UnresolvedBinding(String),

    // === Transport Errors ===
    #[error("Server answered with status {status} and the scenario does not tolerate failing statuses")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    // === Registry Errors ===
    #[error("Duplicate scenario '{name}' in group '{resource}'")]
    DuplicateScenario { resource: String, name: String },

    #[error("Binding '{binding}' is captured by both '{first}' and '{second}'")]
    DuplicateBinding {
        binding: String,
        first: String,
        second: String,
    },

    #[error("Scenario '{scenario}' uses binding '{binding}' but no earlier scenario captures it")]
    UnknownBinding { scenario: String, binding: String },

    #[error("Scenario '{0}' not found")]
    ScenarioNotFound(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario suite '{path}': {reason}")]
    SuiteParse { path: String, reason: String },

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a build error from anything displayable
    pub fn build<S: Into<String>>(message: S) -> Self {
        Self::Build(message.into())
    }

    /// Create a duplicate scenario error
    pub fn duplicate_scenario(resource: &str, name: &str) -> Self {
        Self::DuplicateScenario {
            resource: resource.to_string(),
            name: name.to_string(),
        }
    }

    /// Create a suite parse error
    pub fn suite_parse(path: &str, reason: impl ToString) -> Self {
        Self::SuiteParse {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_actionable() {
        let err = Error::duplicate_scenario("albums", "read album");
        assert_eq!(
            err.to_string(),
            "Duplicate scenario 'read album' in group 'albums'"
        );

        let err = Error::UnresolvedBinding("new_user_id".to_string());
        assert!(err.to_string().contains("capture"));
    }
}
