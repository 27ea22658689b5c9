//! Scenario registry
//!
//! Misconfiguration (duplicate names, dangling bindings) is rejected at
//! registration time, before any request goes out.

use std::collections::HashMap;

use tracing::debug;

use crate::common::{Error, Result};

use super::{Category, RunReport, Runner, Scenario};

/// Ordered collection of scenarios, grouped by resource
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
    /// Binding name -> index of the scenario that captures it
    producers: HashMap<String, usize>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario at the end of the execution order
    pub fn register(&mut self, scenario: Scenario) -> Result<()> {
        if self
            .scenarios
            .iter()
            .any(|s| s.resource == scenario.resource && s.name == scenario.name)
        {
            return Err(Error::duplicate_scenario(&scenario.resource, &scenario.name));
        }

        for binding in scenario.consumes() {
            if !self.producers.contains_key(binding) {
                return Err(Error::UnknownBinding {
                    scenario: scenario.qualified_name(),
                    binding: binding.to_string(),
                });
            }
        }

        let index = self.scenarios.len();
        for (i, capture) in scenario.captures.iter().enumerate() {
            let earlier_here = scenario.captures[..i]
                .iter()
                .any(|c| c.binding == capture.binding);
            if earlier_here {
                return Err(Error::DuplicateBinding {
                    binding: capture.binding.clone(),
                    first: scenario.qualified_name(),
                    second: scenario.qualified_name(),
                });
            }
            if let Some(&first) = self.producers.get(&capture.binding) {
                return Err(Error::DuplicateBinding {
                    binding: capture.binding.clone(),
                    first: self.scenarios[first].qualified_name(),
                    second: scenario.qualified_name(),
                });
            }
        }
        for capture in &scenario.captures {
            self.producers.insert(capture.binding.clone(), index);
        }

        debug!(scenario = %scenario.qualified_name(), "Registered scenario");
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Find a scenario by `name` or `resource/name`
    pub fn find(&self, name: &str) -> Result<&Scenario> {
        let mut matches = self
            .scenarios
            .iter()
            .filter(|s| s.name == name || s.qualified_name() == name);
        let found = matches
            .next()
            .ok_or_else(|| Error::ScenarioNotFound(name.to_string()))?;
        if matches.next().is_some() {
            return Err(Error::Config(format!(
                "Scenario name '{}' is ambiguous; use 'resource/name'",
                name
            )));
        }
        Ok(found)
    }

    /// The scenario that captures `binding`
    pub fn producer_of(&self, binding: &str) -> Option<&Scenario> {
        self.producer_index(binding).map(|i| &self.scenarios[i])
    }

    /// Position of the capturing scenario in registration order
    pub(crate) fn producer_index(&self, binding: &str) -> Option<usize> {
        self.producers.get(binding).copied()
    }

    /// Keep scenarios matching the filters, plus whatever they depend on
    pub fn filter(self, resource: Option<&str>, category: Option<Category>) -> Result<Self> {
        let mut keep: Vec<bool> = self
            .scenarios
            .iter()
            .map(|s| {
                resource.map_or(true, |r| s.resource == r)
                    && category.map_or(true, |c| s.category == c)
            })
            .collect();

        // Producers always precede their consumers, so one backward pass
        // pulls in every transitive dependency.
        for i in (0..self.scenarios.len()).rev() {
            if !keep[i] {
                continue;
            }
            for binding in self.scenarios[i].consumes() {
                if let Some(&producer) = self.producers.get(binding) {
                    keep[producer] = true;
                }
            }
        }

        let mut filtered = ScenarioRegistry::new();
        for (scenario, kept) in self.scenarios.into_iter().zip(keep) {
            if kept {
                filtered.register(scenario)?;
            }
        }
        Ok(filtered)
    }

    /// Run every scenario with `runner`; verdicts come back in registration order
    pub async fn run(&self, runner: &Runner, endpoint: &str) -> RunReport {
        runner.run(self, endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{build, fields, OperationKind, OperationSource, Value};

    fn query(resource: &str, category: Category, name: &str) -> Scenario {
        Scenario::new(
            resource,
            category,
            name,
            OperationSource::Raw(format!("query {{ {} {{ id }} }}", resource)),
        )
    }

    fn consumer(name: &str, binding: &str) -> Scenario {
        let op = build(
            OperationKind::Mutation,
            "deleteUser",
            vec![("id".to_string(), Value::Binding(binding.to_string()))],
            Vec::new(),
        )
        .unwrap();
        Scenario::built("users", Category::Delete, name, op)
    }

    fn producer(name: &str, binding: &str) -> Scenario {
        let op = build(
            OperationKind::Mutation,
            "createUser",
            vec![(
                "input".to_string(),
                Value::object([("name", Value::string("x"))]),
            )],
            fields("id"),
        )
        .unwrap();
        Scenario::built("users", Category::Create, name, op).capture(binding, "createUser.id")
    }

    #[test]
    fn test_duplicate_names_rejected_within_group() {
        let mut registry = ScenarioRegistry::new();
        registry
            .register(query("albums", Category::Read, "read"))
            .unwrap();
        let err = registry
            .register(query("albums", Category::Read, "read"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateScenario { .. }));

        // Same name in another group is fine
        registry
            .register(query("users", Category::Read, "read"))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_binding_must_be_captured_earlier() {
        let mut registry = ScenarioRegistry::new();
        let err = registry
            .register(consumer("delete", "new_user_id"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBinding { .. }));

        registry
            .register(producer("create", "new_user_id"))
            .unwrap();
        registry
            .register(consumer("delete", "new_user_id"))
            .unwrap();
        assert_eq!(
            registry.producer_of("new_user_id").unwrap().name,
            "create"
        );
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut registry = ScenarioRegistry::new();
        registry.register(producer("create a", "id")).unwrap();
        let err = registry.register(producer("create b", "id")).unwrap_err();
        match err {
            Error::DuplicateBinding { first, second, .. } => {
                assert_eq!(first, "users/create a");
                assert_eq!(second, "users/create b");
            }
            other => panic!("Expected DuplicateBinding, got {:?}", other),
        }
    }

    #[test]
    fn test_producer_precedes_consumer() {
        let mut registry = ScenarioRegistry::new();
        registry
            .register(query("albums", Category::Listing, "list"))
            .unwrap();
        registry
            .register(producer("create", "new_user_id"))
            .unwrap();
        registry
            .register(consumer("delete", "new_user_id"))
            .unwrap();
        assert_eq!(registry.producer_index("new_user_id"), Some(1));
        assert_eq!(registry.producer_index("other"), None);
    }

    #[test]
    fn test_filter_keeps_dependencies() {
        let mut registry = ScenarioRegistry::new();
        registry
            .register(query("albums", Category::Listing, "list"))
            .unwrap();
        registry
            .register(producer("create", "new_user_id"))
            .unwrap();
        registry
            .register(consumer("delete", "new_user_id"))
            .unwrap();

        let filtered = registry.filter(None, Some(Category::Delete)).unwrap();
        let names: Vec<&str> = filtered.scenarios().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["create", "delete"]);
    }

    #[test]
    fn test_find_by_name() {
        let mut registry = ScenarioRegistry::new();
        registry
            .register(query("albums", Category::Read, "read"))
            .unwrap();
        registry
            .register(query("users", Category::Read, "read"))
            .unwrap();
        assert!(registry.find("read").is_err());
        assert_eq!(registry.find("users/read").unwrap().resource, "users");
        assert!(matches!(
            registry.find("nope"),
            Err(Error::ScenarioNotFound(_))
        ));
    }
}
