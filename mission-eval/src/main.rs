//! Scenario harness: runs TOML cases against the mission core in process,
//! judges them and aggregates results.

mod case;
mod cli;
mod config;
mod judge;
mod outcome;
mod report;
mod results;
mod run;
mod skills;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cli::EvalPaths;

#[derive(Parser)]
#[command(
    name = "mission-eval",
    version,
    about = "Scenario harness for mission execution"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List case ids under `mission-eval/cases`.
    List,
    /// Run a case and capture its results.
    Run {
        case_id: String,
        #[arg(long, default_value_t = 1)]
        runs: u32,
    },
    /// Aggregate captured runs for a case.
    Report {
        case_id: String,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete captured runs for a case.
    Clean { case_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    mission::logging::init();
    let cli = Cli::parse();
    let paths = EvalPaths::new(&std::env::current_dir().context("resolve working dir")?);
    match cli.command {
        Command::List => cli::list_cases(&paths),
        Command::Run { case_id, runs } => cli::run_case_by_id(&paths, &case_id, runs).await,
        Command::Report { case_id, json } => cli::report_case(&paths, &case_id, json),
        Command::Clean { case_id } => cli::clean_case(&paths, &case_id),
    }
}
