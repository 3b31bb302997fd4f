//! Result capture and persistence.
//!
//! Writes the mission result, ledger synthesis and run metadata to the
//! results directory for later analysis.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use mission::core::anomaly::SafetyStatus;
use mission::core::types::{MissionResult, MissionStatus};
use mission::ledger::Synthesis;

use crate::outcome::Outcome;

/// Input for capturing results from a completed run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    pub case_path: &'a Path,
    pub eval_run_id: &'a str,
    pub result: &'a MissionResult,
    pub synthesis: &'a Synthesis,
    pub anomaly_score: f64,
    pub anomaly_status: SafetyStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Metadata for an eval run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvalMeta {
    pub case_id: String,
    pub eval_run_id: String,
    /// SHA-256 hash of the case file for reproducibility tracking.
    pub case_hash: String,
    pub mission_status: MissionStatus,
    pub anomaly_score: f64,
    pub anomaly_status: SafetyStatus,
    pub ledger_steps: usize,
    pub outcome: Option<Outcome>,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

impl EvalMeta {
    fn from_capture(input: &CaptureInput<'_>, case_hash: String, errors: Vec<String>) -> Self {
        let elapsed = input.finished_at - input.started_at;
        Self {
            case_id: input.case_id.to_string(),
            eval_run_id: input.eval_run_id.to_string(),
            case_hash,
            mission_status: input.result.status,
            anomaly_score: input.anomaly_score,
            anomaly_status: input.anomaly_status,
            ledger_steps: input.synthesis.history.len(),
            outcome: None,
            start_time: input.started_at.to_rfc3339(),
            end_time: input.finished_at.to_rfc3339(),
            duration_secs: elapsed.num_milliseconds() as f64 / 1000.0,
            errors,
        }
    }
}

/// Write `result.json`, `ledger.json` and `meta.json` for one run.
///
/// A case file that cannot be hashed is recorded in `meta.errors` rather than
/// failing the capture.
#[instrument(skip_all, fields(case_id = %input.case_id, eval_run_id = %input.eval_run_id))]
pub fn capture_results(base_dir: &Path, input: &CaptureInput<'_>) -> Result<PathBuf> {
    let run_dir = results_dir(base_dir, input.case_id, input.eval_run_id);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create results dir {}", run_dir.display()))?;

    write_json(&run_dir.join("result.json"), input.result)?;
    write_json(&run_dir.join("ledger.json"), input.synthesis)?;

    let (case_hash, errors) = match file_sha256(input.case_path) {
        Ok(hash) => (hash, Vec::new()),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "case hash unavailable");
            (String::new(), vec![format!("case hash: {err:#}")])
        }
    };
    write_json(
        &run_dir.join("meta.json"),
        &EvalMeta::from_capture(input, case_hash, errors),
    )?;
    debug!(results_dir = %run_dir.display(), "results captured");
    Ok(run_dir)
}

/// Stamp the classified outcome into an existing `meta.json`.
pub fn update_outcome(run_dir: &Path, outcome: Outcome) -> Result<()> {
    let meta_path = run_dir.join("meta.json");
    let contents = fs::read_to_string(&meta_path)
        .with_context(|| format!("read {}", meta_path.display()))?;
    let mut meta: EvalMeta = serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", meta_path.display()))?;
    meta.outcome = Some(outcome);
    write_json(&meta_path, &meta)
}

pub fn results_dir(base_dir: &Path, case_id: &str, eval_run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(eval_run_id)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(hex::encode(Sha256::digest(&contents)))
}
