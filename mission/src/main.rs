//! Mission execution CLI.
//!
//! Runs agents and squads against missions with the simulated skill runtime,
//! dry-runs plans through the state geometry, and scores action windows.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use mission::core::anomaly::{AnomalyScorer, SafetyStatus};
use mission::core::invariants::validate_topology;
use mission::core::types::{MissionResult, MissionStatus};
use mission::core::vertex::{StateVertex, simplex};
use mission::exit_codes;
use mission::io::config::{MissionConfig, load_config};
use mission::io::ledger_log::write_synthesis;
use mission::io::manifest::{load_actions, load_dna, load_mission, load_squad};
use mission::io::skills::SimulatedSkillExecutor;
use mission::orchestrator::{Orchestrator, lock_ledger, ordered_plan};

#[derive(Parser)]
#[command(
    name = "mission",
    version,
    about = "Geometry-gated mission execution core"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one agent against a mission and print the result.
    Run {
        /// Agent DNA JSON (`skills_manifest`, optional `reasoning_protocol`).
        #[arg(long)]
        dna: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run a coordinator/worker squad against a mission.
    Squad {
        /// JSON array of squad members (`id`, `role`, `skills`).
        #[arg(long)]
        squad: PathBuf,
        /// Squad identifier used in logs.
        #[arg(long, default_value = "squad")]
        squad_id: String,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Print the ordered plan with speculative geometry verdicts.
    Plan {
        #[arg(long)]
        dna: PathBuf,
        #[arg(long)]
        mission: PathBuf,
        #[arg(long, default_value = "mission.toml")]
        config: PathBuf,
    },
    /// Score a window of agent actions.
    Score {
        /// JSON array of actions (`skill_id`, `timestamp`, `features`).
        #[arg(long)]
        actions: PathBuf,
        #[arg(long, default_value = "mission.toml")]
        config: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Mission JSON (`id`, `objective`, optional `context`, `priority`, `deadline`).
    #[arg(long)]
    mission: PathBuf,
    /// Config TOML; defaults apply when the file is missing.
    #[arg(long, default_value = "mission.toml")]
    config: PathBuf,
    /// Write the ledger synthesis (result, stats, history) to this path.
    #[arg(long)]
    ledger_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct AnomalyReport {
    score: f64,
    status: SafetyStatus,
}

#[derive(Serialize)]
struct RunReport<'a> {
    mission: &'a MissionResult,
    anomaly: AnomalyReport,
}

#[tokio::main]
async fn main() {
    mission::logging::init();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { dna, common } => cmd_run(&dna, &common).await,
        Command::Squad {
            squad,
            squad_id,
            common,
        } => cmd_squad(&squad, &squad_id, &common).await,
        Command::Plan {
            dna,
            mission,
            config,
        } => cmd_plan(&dna, &mission, &config),
        Command::Score { actions, config } => cmd_score(&actions, &config),
    }
}

async fn cmd_run(dna_path: &Path, common: &CommonArgs) -> Result<i32> {
    let config = load_config(&common.config)?;
    let dna = load_dna(dna_path)?;
    let mission = load_mission(&common.mission)?;
    let orchestrator = Orchestrator::new(SimulatedSkillExecutor).with_config(&config);

    let result = orchestrator.orchestrate(&dna, &mission).await;
    finish(&orchestrator, &config, &result, common.ledger_out.as_deref())
}

async fn cmd_squad(squad_path: &Path, squad_id: &str, common: &CommonArgs) -> Result<i32> {
    let config = load_config(&common.config)?;
    let members = load_squad(squad_path)?;
    let mission = load_mission(&common.mission)?;
    let orchestrator = Orchestrator::new(SimulatedSkillExecutor).with_config(&config);

    let result = orchestrator
        .orchestrate_squad(squad_id, &members, &mission)
        .await;
    finish(&orchestrator, &config, &result, common.ledger_out.as_deref())
}

/// Print the result with the sidecar anomaly verdict and pick the exit code.
fn finish(
    orchestrator: &Orchestrator<SimulatedSkillExecutor>,
    config: &MissionConfig,
    result: &MissionResult,
    ledger_out: Option<&Path>,
) -> Result<i32> {
    let (synthesis, actions) = {
        let ledger = lock_ledger(orchestrator.ledger());
        (ledger.synthesize(), ledger.actions())
    };
    if let Some(path) = ledger_out {
        write_synthesis(path, &synthesis)?;
    }

    let scorer = AnomalyScorer::new(config.catalog.clone());
    let score = scorer.analyze_topology(&actions);
    let status = scorer.status(score);
    print_json(&RunReport {
        mission: result,
        anomaly: AnomalyReport { score, status },
    })?;

    Ok(if scorer.should_freeze(score) {
        exit_codes::FROZEN
    } else if result.status == MissionStatus::Success {
        exit_codes::OK
    } else {
        exit_codes::MISSION_FAILED
    })
}

fn cmd_plan(dna_path: &Path, mission_path: &Path, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let dna = load_dna(dna_path)?;
    let mission = load_mission(mission_path)?;
    let orchestrator = Orchestrator::new(SimulatedSkillExecutor).with_config(&config);

    let plan = orchestrator.plan(&dna, &mission);
    let ordered = ordered_plan(&plan).context("order plan")?;
    let warnings = validate_topology(&ordered, orchestrator.catalog());

    let mut working = simplex(&[StateVertex::Init]);
    let mut steps = Vec::with_capacity(ordered.len());
    for step in &ordered {
        let vertex = orchestrator.catalog().vertex_for(&step.skill_id);
        let transition = vertex.map(|vertex| {
            let weights = orchestrator.weights().sample();
            orchestrator
                .validator()
                .validate_and_weigh_transition(&working, vertex, &weights)
        });
        if let (Some(vertex), Some(true)) = (vertex, transition.map(|t| t.is_valid)) {
            working.insert(vertex);
        }
        steps.push(json!({
            "id": step.id,
            "skill_id": step.skill_id,
            "dependencies": step.dependencies,
            "vertex": vertex,
            "valid": transition.is_none_or(|transition| transition.is_valid),
            "topological_weight": transition.map(|transition| transition.topological_weight),
        }));
    }

    print_json(&json!({
        "mission_id": mission.id,
        "steps": steps,
        "warnings": warnings,
    }))?;
    Ok(exit_codes::OK)
}

fn cmd_score(actions_path: &Path, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let actions = load_actions(actions_path)?;
    let scorer = AnomalyScorer::new(config.catalog);
    let score = scorer.analyze_topology(&actions);
    print_json(&AnomalyReport {
        score,
        status: scorer.status(score),
    })?;
    Ok(if scorer.should_freeze(score) {
        exit_codes::FROZEN
    } else {
        exit_codes::OK
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize output json")?;
    println!("{payload}");
    Ok(())
}
