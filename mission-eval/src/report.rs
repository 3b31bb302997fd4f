//! Aggregation of captured runs into a per-case summary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::judge::Judgment;
use crate::outcome::Outcome;
use crate::results::EvalMeta;

/// Passed/total tallies for one check label.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassRate {
    pub passed: usize,
    pub total: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct ReportSummary {
    pub runs: usize,
    pub success: usize,
    pub fail: usize,
    pub frozen: usize,
    pub error: usize,
    pub avg_duration_secs: Option<f64>,
    pub avg_anomaly_score: Option<f64>,
    pub check_pass_rates: BTreeMap<String, PassRate>,
}

/// One captured run as read back from disk.
#[derive(Debug)]
struct RunRecord {
    meta: EvalMeta,
    judgment: Judgment,
}

impl ReportSummary {
    fn record(&mut self, run: &RunRecord) {
        self.runs += 1;
        let bucket = match run.meta.outcome {
            Some(Outcome::Success) => &mut self.success,
            Some(Outcome::Fail) => &mut self.fail,
            Some(Outcome::Frozen) => &mut self.frozen,
            Some(Outcome::Error) | None => &mut self.error,
        };
        *bucket += 1;

        self.avg_duration_secs = Some(running_mean(
            self.avg_duration_secs,
            run.meta.duration_secs,
            self.runs,
        ));
        self.avg_anomaly_score = Some(running_mean(
            self.avg_anomaly_score,
            run.meta.anomaly_score,
            self.runs,
        ));

        for check in &run.judgment.checks {
            let rate = self.check_pass_rates.entry(check.label()).or_default();
            rate.total += 1;
            if check.passed() {
                rate.passed += 1;
            }
        }
    }
}

/// Run directories under a case's results, sorted by name (oldest first).
pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .context("read run entry")?;
    dirs.retain(|path| path.is_dir());
    dirs.sort();
    Ok(dirs)
}

/// Summarize every readable run. Unreadable runs are skipped with a warning.
pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        match load_run(&run_dir) {
            Ok(run) => summary.record(&run),
            Err(err) => warnings.push(format!("skip {}: {err:#}", run_dir.display())),
        }
    }

    Ok((summary, warnings))
}

fn load_run(run_dir: &Path) -> Result<RunRecord> {
    Ok(RunRecord {
        meta: read_json(&run_dir.join("meta.json"))?,
        judgment: read_json(&run_dir.join("checks.json"))?,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn running_mean(avg: Option<f64>, value: f64, count: usize) -> f64 {
    match avg {
        None => value,
        Some(avg) => (avg * (count as f64 - 1.0) + value) / count as f64,
    }
}
