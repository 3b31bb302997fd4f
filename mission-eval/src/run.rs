//! Case execution orchestration.
//!
//! Builds the orchestrator for a case, runs the mission in process, scores the
//! ledger and captures results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, instrument};

use mission::core::anomaly::AnomalyScorer;
use mission::io::config::MissionConfig;
use mission::orchestrator::{Orchestrator, lock_ledger};

use crate::case::CaseFile;
use crate::config::apply_case_config;
use crate::judge::{Observation, run_checks};
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results, update_outcome, write_json};
use crate::skills::CaseSkillExecutor;

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique identifier for this eval run.
    pub eval_run_id: String,
    /// Path to the results directory.
    pub results_dir: PathBuf,
    /// Classified outcome.
    pub outcome: Outcome,
}

/// Run a case end-to-end: mission, anomaly scoring, checks, result capture.
#[instrument(skip_all, fields(case_id = %case.case.id))]
pub async fn run_case(results_base: &Path, case_path: &Path, case: &CaseFile) -> Result<RunOutcome> {
    info!("case run started");

    let effective = apply_case_config(MissionConfig::default(), &case.config)
        .context("apply case config")?;
    let orchestrator = Orchestrator::new(CaseSkillExecutor::new(&case.skills))
        .with_config(&effective.mission)
        .with_step_timeout(effective.step_timeout);
    let mission = case.mission.mission();

    let started_at = Utc::now();
    let eval_run_id = eval_run_id();
    debug!(eval_run_id = %eval_run_id, squad = case.is_squad(), "running mission");
    let result = match &case.agent {
        Some(agent) => orchestrator.orchestrate(&agent.dna(), &mission).await,
        None => {
            let members: Vec<_> = case.squad.iter().map(|member| member.member()).collect();
            orchestrator
                .orchestrate_squad(&case.case.id, &members, &mission)
                .await
        }
    };
    let finished_at = Utc::now();
    info!(
        status = ?result.status,
        duration_secs = (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
        "mission finished"
    );

    let (synthesis, actions) = {
        let ledger = lock_ledger(orchestrator.ledger());
        (ledger.synthesize(), ledger.actions())
    };
    let scorer = AnomalyScorer::new(effective.mission.catalog.clone());
    let anomaly_score = scorer.analyze_topology(&actions);
    let anomaly_status = scorer.status(anomaly_score);

    debug!("capturing results");
    let capture_input = CaptureInput {
        case_id: &case.case.id,
        case_path,
        eval_run_id: &eval_run_id,
        result: &result,
        synthesis: &synthesis,
        anomaly_score,
        anomaly_status,
        started_at,
        finished_at,
    };
    let results_dir = capture_results(results_base, &capture_input).context("capture results")?;

    debug!("running checks");
    let judgment = run_checks(
        &case.checks,
        &Observation {
            result: &result,
            history: &synthesis.history,
            anomaly: anomaly_status,
        },
    );
    write_json(&results_dir.join("checks.json"), &judgment).context("write checks")?;

    let outcome = classify_outcome(&result, scorer.should_freeze(anomaly_score), &judgment);
    update_outcome(&results_dir, outcome).context("update outcome")?;

    info!(outcome = ?outcome, results_dir = %results_dir.display(), "case run complete");

    Ok(RunOutcome {
        eval_run_id,
        results_dir,
        outcome,
    })
}

/// Timestamped id with a random suffix so repeated runs within one second
/// land in distinct directories.
fn eval_run_id() -> String {
    let suffix: u16 = rand::thread_rng().r#gen();
    format!("eval-{}-{suffix:04x}", Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn eval_run_id_format() {
        let id = eval_run_id();
        assert!(id.starts_with("eval-"));
        assert_eq!(id.len(), "eval-20260101_000000-abcd".len());
    }

    const TRADE_CASE: &str = r#"
[case]
id = "gated-trade"

[agent]
skills = ["price_oracle", "flash_arbitrage"]

[mission]
id = "m-1"
objective = "capture spread"

[config]
fixed_weights = [100.0, 0.1, 0.95]

[[skills]]
id = "price_oracle"
data = { price = 150.25 }

[[skills]]
id = "flash_arbitrage"
data = { status = "EXECUTED" }

[[checks]]
type = "status_is"
status = "FAILED"

[[checks]]
type = "step_failed"
skill = "flash_arbitrage"

[[checks]]
type = "ledger_steps"
count = 2
"#;

    #[tokio::test]
    async fn blocked_trade_case_passes_its_checks() {
        let temp = tempdir().expect("tempdir");
        let case_path = temp.path().join("gated-trade.toml");
        fs::write(&case_path, TRADE_CASE).expect("case");
        let case = CaseFile::load(&case_path).expect("load");

        let run = run_case(&temp.path().join("results"), &case_path, &case)
            .await
            .expect("run");

        assert_eq!(run.outcome, Outcome::Success);
        for artifact in ["meta.json", "result.json", "ledger.json", "checks.json"] {
            assert!(run.results_dir.join(artifact).exists(), "{artifact}");
        }
    }
}
