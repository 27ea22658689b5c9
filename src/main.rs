//! gqlcheck - contract tests for GraphQL services
//!
//! Runs YAML scenario suites against a GraphQL endpoint and reports a
//! verdict per scenario.

use clap::Parser;
use commands::Commands;
use gqlcheck::{cli, commands, common::logging};

#[derive(Parser)]
#[command(name = "gqlcheck", about = "Contract tests for GraphQL services")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command, cli.verbose).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
