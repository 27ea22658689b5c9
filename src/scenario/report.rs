//! Run reports

use colored::Colorize;
use serde::Serialize;

use crate::assertion::Verdict;
use crate::common::Result;
use crate::normalize::OutcomeKind;

use super::{Category, Scenario};

/// Verdict and diagnostics for one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub resource: String,
    pub category: Category,
    pub name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    /// HTTP status, when a request was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeKind>,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub(crate) fn new(scenario: &Scenario) -> Self {
        Self {
            resource: scenario.resource.clone(),
            category: scenario.category,
            name: scenario.name.clone(),
            verdict: Verdict::Pass,
            status: None,
            outcome: None,
            duration_ms: 0,
        }
    }

    /// `resource/name`, unique within a run
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.resource, self.name)
    }
}

/// Ordered results of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<ScenarioResult>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(|v| v.is_pass())
    }

    pub fn failed(&self) -> usize {
        self.count(|v| v.is_fail())
    }

    pub fn cancelled(&self) -> usize {
        self.count(|v| *v == Verdict::Cancelled)
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.verdict)).count()
    }

    /// `(resource/name, verdict)` pairs in registration order
    pub fn pairs(&self) -> Vec<(String, &Verdict)> {
        self.results
            .iter()
            .map(|r| (r.qualified_name(), &r.verdict))
            .collect()
    }

    /// Process exit status: 1 if any scenario failed
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Print the human-readable report to stdout
    pub fn print(&self, verbose: bool) {
        let mut current: Option<&str> = None;
        for result in &self.results {
            if current != Some(result.resource.as_str()) {
                println!("\n{}", result.resource.cyan().bold());
                current = Some(result.resource.as_str());
            }

            let timing = format!("({} ms)", result.duration_ms);
            match &result.verdict {
                Verdict::Pass => {
                    if verbose {
                        println!(
                            "  {} {} {} {}",
                            "✓".green(),
                            result.name,
                            format!("[{}]", result.category).dimmed(),
                            timing.dimmed()
                        );
                    } else {
                        println!("  {} {}", "✓".green(), result.name);
                    }
                }
                Verdict::Fail(detail) => {
                    println!("  {} {} {}", "✗".red(), result.name, timing.dimmed());
                    println!("      {}", detail.red());
                }
                Verdict::Cancelled => {
                    println!("  {} {} {}", "-".yellow(), result.name, "cancelled".yellow());
                }
            }
        }

        println!();
        let mut summary = format!("{} passed", self.passed()).green().to_string();
        if self.failed() > 0 {
            summary.push_str(&format!(", {}", format!("{} failed", self.failed()).red()));
        }
        if self.cancelled() > 0 {
            summary.push_str(&format!(
                ", {}",
                format!("{} cancelled", self.cancelled()).yellow()
            ));
        }
        let mark = if self.failed() > 0 {
            "✗".red().bold()
        } else {
            "✓".green().bold()
        };
        println!(
            "{} {} {}",
            mark,
            summary,
            format!("in {:.2}s", self.duration_ms as f64 / 1000.0).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, verdict: Verdict) -> ScenarioResult {
        ScenarioResult {
            resource: "albums".to_string(),
            category: Category::Read,
            name: name.to_string(),
            verdict,
            status: Some(200),
            outcome: Some(OutcomeKind::Success),
            duration_ms: 12,
        }
    }

    #[test]
    fn test_counts_and_exit_code() {
        let report = RunReport {
            results: vec![
                result("a", Verdict::Pass),
                result("b", Verdict::Cancelled),
            ],
            duration_ms: 30,
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.cancelled(), 1);
        assert_eq!(report.exit_code(), 0);

        let report = RunReport {
            results: vec![result("a", Verdict::Fail("nope".into()))],
            duration_ms: 30,
        };
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.pairs()[0].0, "albums/a");
    }

    #[test]
    fn test_pairs_tell_groups_apart() {
        let mut users = result("reject a malformed query", Verdict::Pass);
        users.resource = "users".to_string();
        let report = RunReport {
            results: vec![
                result("reject a malformed query", Verdict::Fail("status".into())),
                users,
            ],
            duration_ms: 8,
        };
        let pairs = report.pairs();
        assert_eq!(pairs[0].0, "albums/reject a malformed query");
        assert_eq!(pairs[1].0, "users/reject a malformed query");
        assert!(pairs[0].1.is_fail());
        assert!(pairs[1].1.is_pass());
    }

    #[test]
    fn test_json_shape() {
        let report = RunReport {
            results: vec![result("read album", Verdict::Fail("isNull(album.title)".into()))],
            duration_ms: 5,
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let entry = &json["results"][0];
        assert_eq!(entry["name"], "read album");
        assert_eq!(entry["category"], "read");
        assert_eq!(entry["verdict"], "fail");
        assert_eq!(entry["detail"], "isNull(album.title)");
        assert_eq!(entry["outcome"], "success");
    }
}
