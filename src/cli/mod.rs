//! CLI command handling
//!
//! Loads configuration and suites, wires the HTTP transport into a runner
//! and formats output.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::operation::Bindings;
use crate::scenario::{load_suite, CancelToken, Prepared, Runner, Suite};
use crate::transport::HttpTransport;

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands, verbose: bool) -> Result<i32> {
    match command {
        Commands::Run {
            suite,
            endpoint,
            concurrency,
            timeout,
            resource,
            category,
            json,
        } => {
            let config = Config::load()?;
            let loaded = load_suite(&suite)?;
            let endpoint = resolve_endpoint(endpoint, &loaded, &config)?;

            let registry = loaded.registry.filter(resource.as_deref(), category)?;
            if registry.is_empty() {
                return Err(Error::Config(
                    "No scenarios match the given filters".to_string(),
                ));
            }

            let request_timeout = match timeout {
                Some(0) => {
                    return Err(Error::Config("--timeout must be at least 1".to_string()))
                }
                Some(secs) => Duration::from_secs(secs),
                None => config.timeouts.request(),
            };
            let concurrency = concurrency.unwrap_or(config.run.concurrency);
            if concurrency == 0 {
                return Err(Error::Config("--concurrency must be at least 1".to_string()));
            }

            let transport = HttpTransport::new(&config.target, request_timeout)?;
            let cancel = CancelToken::new();
            let runner = Runner::new(Arc::new(transport))
                .with_concurrency(concurrency)
                .with_cancel(cancel.clone());

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, cancelling in-flight scenarios");
                    cancel.cancel();
                }
            });

            if !json {
                let title = loaded
                    .name
                    .clone()
                    .unwrap_or_else(|| suite.display().to_string());
                println!(
                    "{} {} {}",
                    "Running suite:".blue().bold(),
                    title.white().bold(),
                    format!("({} scenarios against {})", registry.len(), endpoint).dimmed()
                );
                if let Some(description) = &loaded.description {
                    println!("  {}", description.dimmed());
                }
            }

            let report = registry.run(&runner, &endpoint).await;

            if json {
                println!("{}", report.to_json()?);
            } else {
                report.print(verbose);
            }
            Ok(report.exit_code())
        }

        Commands::List { suite } => {
            let loaded = load_suite(&suite)?;
            let mut current: Option<&str> = None;
            for scenario in loaded.registry.scenarios() {
                if current != Some(scenario.resource.as_str()) {
                    println!("{}", scenario.resource.cyan().bold());
                    current = Some(scenario.resource.as_str());
                }
                let marker = match scenario.operation {
                    Prepared::Ready(_) => " ".normal(),
                    Prepared::Invalid(_) => "!".red(),
                };
                println!(
                    " {} {} {}",
                    marker,
                    scenario.name,
                    format!("[{}]", scenario.category).dimmed()
                );
                if let Some(description) = &scenario.description {
                    println!("     {}", description.dimmed());
                }
            }
            println!("\n{} scenario(s)", loaded.registry.len());
            Ok(0)
        }

        Commands::Render { suite, name } => {
            let loaded = load_suite(&suite)?;
            let scenario = loaded.registry.find(&name)?;
            let source = match &scenario.operation {
                Prepared::Ready(source) => source,
                Prepared::Invalid(reason) => return Err(Error::build(reason.clone())),
            };

            // Bindings only exist during a run; show their names instead
            let mut placeholders = Bindings::new();
            for binding in scenario.consumes() {
                placeholders.insert(binding.to_string(), JsonValue::String(format!("${}", binding)));
            }
            if !placeholders.is_empty() {
                debug!("Rendering with binding placeholders");
                eprintln!(
                    "{}",
                    "note: binding values are captured at run time; names shown instead".dimmed()
                );
            }
            println!("{}", source.render(&placeholders)?);
            Ok(0)
        }
    }
}

/// CLI flag, then the suite, then the config file
fn resolve_endpoint(cli: Option<String>, suite: &Suite, config: &Config) -> Result<String> {
    cli.or_else(|| suite.endpoint.clone())
        .or_else(|| config.target.endpoint.clone())
        .ok_or_else(|| {
            Error::Config(
                "No endpoint configured. Pass --endpoint, set 'endpoint' in the suite, \
                 or set [target] endpoint in the config file"
                    .to_string(),
            )
        })
}
