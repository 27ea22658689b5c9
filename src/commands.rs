//! CLI command definitions
//!
//! Defines the clap commands for the gqlcheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::scenario::Category;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario suite
    Run {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Endpoint to test (overrides the suite and the config file)
        #[arg(long, short)]
        endpoint: Option<String>,

        /// Maximum number of scenarios in flight
        #[arg(long, short)]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Only run scenarios for this resource (e.g. albums)
        #[arg(long, short)]
        resource: Option<String>,

        /// Only run scenarios in this category (e.g. pagination)
        #[arg(long)]
        category: Option<Category>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the scenarios in a suite
    #[command(alias = "ls")]
    List {
        /// Path to the YAML suite file
        suite: PathBuf,
    },

    /// Print the document a scenario would send
    Render {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Scenario name, or resource/name when names repeat
        name: String,
    },
}
