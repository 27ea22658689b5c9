//! Scenario execution
//!
//! Scenarios are dispatched in registration order with bounded
//! concurrency. Each scenario publishes its captured bindings through a
//! `watch` slot; consumers wait only on the slots of their own producers.

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::assertion::{evaluate_scenario, lookup, Verdict};
use crate::common::Error;
use crate::normalize::{normalize, NormalizedResult};
use crate::operation::Bindings;
use crate::transport::{Body, Transport};

use super::report::{RunReport, ScenarioResult};
use super::{Prepared, Scenario, ScenarioRegistry};

/// Default number of scenarios in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Shared cancellation flag for a run
///
/// Clones observe the same flag. Once cancelled, in-flight sends are
/// abandoned and scenarios not yet started are recorded as cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in self, so wait_for can only end by seeing `true`
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a binding has no value for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unavailable {
    ProducerFailed,
    ProducerCancelled,
}

/// What a finished scenario hands to the scenarios consuming its captures
type Published = Result<Bindings, Unavailable>;

/// Executes registered scenarios against one endpoint
pub struct Runner {
    transport: Arc<dyn Transport>,
    concurrency: usize,
    cancel: CancelToken,
}

impl Runner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run every scenario and report verdicts in registration order
    ///
    /// Scenarios start in registration order with at most `concurrency` in
    /// flight. A consumer holds its slot until the producers of its
    /// bindings have finished; producers always start first, so this
    /// cannot deadlock.
    pub async fn run(&self, registry: &ScenarioRegistry, endpoint: &str) -> RunReport {
        let started = Instant::now();
        let scenarios = registry.scenarios();

        info!(
            scenarios = scenarios.len(),
            concurrency = self.concurrency,
            "Running against {}",
            endpoint
        );

        // One slot per scenario, filled when it finishes
        let slots: Vec<watch::Sender<Option<Published>>> = scenarios
            .iter()
            .map(|_| watch::channel(None).0)
            .collect();

        let mut finished: Vec<_> = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| {
                let slots = &slots;
                async move {
                    let (result, captured) =
                        self.run_one(registry, scenario, endpoint, slots).await;
                    let published = match &result.verdict {
                        Verdict::Pass => Ok(captured),
                        Verdict::Fail(_) => Err(Unavailable::ProducerFailed),
                        Verdict::Cancelled => Err(Unavailable::ProducerCancelled),
                    };
                    slots[index].send_replace(Some(published));
                    (index, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        finished.sort_by_key(|(index, _)| *index);

        RunReport {
            results: finished.into_iter().map(|(_, result)| result).collect(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Wait for the producers of every consumed binding and collect their values
    async fn inputs(
        &self,
        registry: &ScenarioRegistry,
        scenario: &Scenario,
        slots: &[watch::Sender<Option<Published>>],
    ) -> Result<Bindings, (String, Unavailable)> {
        let mut bindings = Bindings::new();
        for binding in scenario.consumes() {
            let Some(producer) = registry.producer_index(binding) else {
                continue;
            };
            let mut receiver = slots[producer].subscribe();
            if receiver.borrow().is_none() {
                debug!(
                    scenario = %scenario.qualified_name(),
                    binding,
                    "Waiting for producer"
                );
            }
            // The senders outlive this wait, so an error cannot happen in practice
            let published = match receiver.wait_for(Option::is_some).await {
                Ok(published) => (*published).clone(),
                Err(_) => None,
            };
            let value = match published {
                Some(Ok(captured)) => captured.get(binding).cloned(),
                Some(Err(reason)) => return Err((binding.to_string(), reason)),
                None => return Err((binding.to_string(), Unavailable::ProducerCancelled)),
            };
            match value {
                Some(value) => {
                    bindings.insert(binding.to_string(), value);
                }
                None => return Err((binding.to_string(), Unavailable::ProducerFailed)),
            }
        }
        Ok(bindings)
    }

    async fn run_one(
        &self,
        registry: &ScenarioRegistry,
        scenario: &Scenario,
        endpoint: &str,
        slots: &[watch::Sender<Option<Published>>],
    ) -> (ScenarioResult, Bindings) {
        let started = Instant::now();
        let mut result = ScenarioResult::new(scenario);

        let finish = |mut result: ScenarioResult, verdict: Verdict| {
            result.verdict = verdict;
            result.duration_ms = started.elapsed().as_millis() as u64;
            match &result.verdict {
                Verdict::Pass => debug!(scenario = %scenario.qualified_name(), "Passed"),
                Verdict::Fail(detail) => {
                    info!(scenario = %scenario.qualified_name(), "Failed: {}", detail)
                }
                Verdict::Cancelled => debug!(scenario = %scenario.qualified_name(), "Cancelled"),
            }
            result
        };

        if self.cancel.is_cancelled() {
            return (finish(result, Verdict::Cancelled), Bindings::new());
        }

        let bindings = match self.inputs(registry, scenario, slots).await {
            Ok(bindings) => bindings,
            Err((_, Unavailable::ProducerCancelled)) => {
                return (finish(result, Verdict::Cancelled), Bindings::new());
            }
            Err((binding, Unavailable::ProducerFailed)) => {
                let detail = format!("binding unavailable: '{}'", binding);
                return (finish(result, Verdict::Fail(detail)), Bindings::new());
            }
        };

        // Producers may have taken a while
        if self.cancel.is_cancelled() {
            return (finish(result, Verdict::Cancelled), Bindings::new());
        }

        let text = match &scenario.operation {
            Prepared::Ready(source) => match source.render(&bindings) {
                Ok(text) => text,
                Err(e) => {
                    let detail = format!("build error: {}", e);
                    return (finish(result, Verdict::Fail(detail)), Bindings::new());
                }
            },
            Prepared::Invalid(reason) => {
                let detail = format!("build error: {}", reason);
                return (finish(result, Verdict::Fail(detail)), Bindings::new());
            }
        };

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            sent = self.transport.send(endpoint, &text, &scenario.options) => Some(sent),
        };

        let normalized = match sent {
            None => return (finish(result, Verdict::Cancelled), Bindings::new()),
            Some(Ok(response)) => normalize(response),
            // A status rejected by the fail_on_status policy is still a
            // transport failure as far as the gate is concerned
            Some(Err(Error::UnexpectedStatus { status, body })) => {
                NormalizedResult::TransportError {
                    status,
                    body: Body::Text(body),
                }
            }
            Some(Err(e)) => {
                warn!(scenario = %scenario.qualified_name(), "Send failed: {}", e);
                return (finish(result, Verdict::Fail(e.to_string())), Bindings::new());
            }
        };

        result.status = Some(normalized.status());
        result.outcome = Some(normalized.kind());

        let verdict = evaluate_scenario(
            &normalized,
            &scenario.expectations,
            scenario.expect_transport_failure,
        );
        if !verdict.is_pass() {
            return (finish(result, verdict), Bindings::new());
        }

        match capture(scenario, &normalized) {
            Ok(captured) => (finish(result, Verdict::Pass), captured),
            Err(detail) => (finish(result, Verdict::Fail(detail)), Bindings::new()),
        }
    }
}

/// Extract the scenario's declared bindings from a passing result
fn capture(scenario: &Scenario, result: &NormalizedResult) -> Result<Bindings, String> {
    let mut captured = Bindings::new();
    if scenario.captures.is_empty() {
        return Ok(captured);
    }
    let data = result
        .data()
        .ok_or_else(|| format!("capture: no data in {}", result.summary()))?;
    for capture in &scenario.captures {
        match lookup(data, &capture.path) {
            Some(JsonValue::Null) | None => {
                return Err(format!(
                    "capture '{}': no value at {}",
                    capture.binding, capture.path
                ));
            }
            Some(value) => {
                captured.insert(capture.binding.clone(), value.clone());
            }
        }
    }
    Ok(captured)
}
