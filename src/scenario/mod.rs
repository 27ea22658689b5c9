//! Scenarios, their registry and execution
//!
//! A scenario binds one operation to its expectations. Scenarios are
//! independent unless one explicitly consumes a value another captured;
//! there is no implicit shared fixture state.

mod registry;
mod report;
mod runner;
mod suite;

pub use registry::ScenarioRegistry;
pub use report::{RunReport, ScenarioResult};
pub use runner::{CancelToken, Runner};
pub use suite::{load_suite, parse_suite, Suite};

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assertion::Expectation;
use crate::common::Error;
use crate::operation::{Operation, OperationSource};
use crate::transport::SendOptions;

/// What kind of behaviour a scenario checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Listing,
    Pagination,
    Sorting,
    Search,
    Create,
    Read,
    Update,
    Delete,
    ErrorHandling,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Listing,
        Category::Pagination,
        Category::Sorting,
        Category::Search,
        Category::Create,
        Category::Read,
        Category::Update,
        Category::Delete,
        Category::ErrorHandling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Listing => "listing",
            Category::Pagination => "pagination",
            Category::Sorting => "sorting",
            Category::Search => "search",
            Category::Create => "create",
            Category::Read => "read",
            Category::Update => "update",
            Category::Delete => "delete",
            Category::ErrorHandling => "error_handling",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                Error::Config(format!(
                    "Unknown category '{}'. Known categories: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// The scenario's operation, or the reason it could not be built
///
/// A malformed operation only fails its own scenario, so the build error
/// is kept and reported when the scenario runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Ready(OperationSource),
    Invalid(String),
}

/// A value exported from a passing scenario's data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub binding: String,
    pub path: String,
}

/// A named test case: one operation plus its expectations
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub resource: String,
    pub category: Category,
    pub description: Option<String>,
    pub operation: Prepared,
    pub expectations: Vec<Expectation>,
    /// A transport failure (non-GraphQL non-2xx, timeout) is the expected outcome
    pub expect_transport_failure: bool,
    pub options: SendOptions,
    pub captures: Vec<Capture>,
}

impl Scenario {
    pub fn new(
        resource: impl Into<String>,
        category: Category,
        name: impl Into<String>,
        operation: OperationSource,
    ) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            category,
            description: None,
            operation: Prepared::Ready(operation),
            expectations: Vec::new(),
            expect_transport_failure: false,
            options: SendOptions::default(),
            captures: Vec::new(),
        }
    }

    /// Shorthand for a scenario around a built operation
    pub fn built(
        resource: impl Into<String>,
        category: Category,
        name: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self::new(resource, category, name, OperationSource::Built(operation))
    }

    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    pub fn capture(mut self, binding: impl Into<String>, path: impl Into<String>) -> Self {
        self.captures.push(Capture {
            binding: binding.into(),
            path: path.into(),
        });
        self
    }

    pub fn allow_transport_failure(mut self) -> Self {
        self.expect_transport_failure = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = Some(endpoint.into());
        self
    }

    /// Binding names this scenario consumes
    pub fn consumes(&self) -> Vec<&str> {
        match &self.operation {
            Prepared::Ready(source) => source.bindings(),
            Prepared::Invalid(_) => Vec::new(),
        }
    }

    /// `resource/name`, unique across the registry
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.resource, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("sorting".parse::<Category>().unwrap(), Category::Sorting);
        assert_eq!(
            "error-handling".parse::<Category>().unwrap(),
            Category::ErrorHandling
        );
        assert_eq!("READ".parse::<Category>().unwrap(), Category::Read);
        let err = "misc".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("Known categories"));
    }

    #[test]
    fn test_category_yaml_form() {
        let category: Category = serde_yaml::from_str("error_handling").unwrap();
        assert_eq!(category, Category::ErrorHandling);
    }

    #[test]
    fn test_consumes_reports_bindings() {
        use crate::operation::{build, OperationKind, Value};

        let op = build(
            OperationKind::Mutation,
            "deleteUser",
            vec![("id".to_string(), Value::Binding("new_user_id".to_string()))],
            Vec::new(),
        )
        .unwrap();
        let scenario = Scenario::built("users", Category::Delete, "delete user", op);
        assert_eq!(scenario.consumes(), vec!["new_user_id"]);
        assert_eq!(scenario.qualified_name(), "users/delete user");
    }
}
