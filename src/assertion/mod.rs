//! Assertion engine
//!
//! Declarative expectations evaluated against normalized results. See
//! [`Expectation`] for the available predicates.

mod engine;
mod expectation;

pub use engine::{compare_values, evaluate, evaluate_all, evaluate_scenario, lookup};
pub use expectation::{ErrorMessageCheck, Expectation, JsonKind, PathList, SortOrder};
pub(crate) use expectation::deserialize_expectations;

use serde::Serialize;

/// Outcome of evaluating a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    /// Detail explains the first failing check
    Fail(String),
    /// The run was cancelled before this scenario finished
    Cancelled,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail(_))
    }

    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            Verdict::Fail(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}
