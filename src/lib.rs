//! gqlcheck - contract tests for GraphQL services
//!
//! Scenarios are built from typed operations, sent over HTTP, normalized
//! into success / GraphQL errors / transport errors, and checked against
//! declarative expectations.

pub mod assertion;
pub mod cli;
pub mod commands;
pub mod common;
pub mod normalize;
pub mod operation;
pub mod scenario;
pub mod transport;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scenario::{Runner, Scenario, ScenarioRegistry};
