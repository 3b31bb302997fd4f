//! CLI command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases};
use crate::report::{ReportSummary, aggregate};
use crate::run::run_case;

/// Harness directories, all under `<repo>/mission-eval/`.
#[derive(Debug, Clone)]
pub struct EvalPaths {
    pub cases: PathBuf,
    pub results: PathBuf,
}

impl EvalPaths {
    pub fn new(repo_root: &Path) -> Self {
        let base = repo_root.join("mission-eval");
        Self {
            cases: base.join("cases"),
            results: base.join("results"),
        }
    }

    fn case_file(&self, case_id: &str) -> PathBuf {
        self.cases.join(format!("{case_id}.toml"))
    }
}

pub fn list_cases(paths: &EvalPaths) -> Result<()> {
    for case in discover_cases(&paths.cases)? {
        match case.case.description.as_str() {
            "" => println!("{}", case.case.id),
            description => println!("{}\t{}", case.case.id, description),
        }
    }
    Ok(())
}

/// Run a case `runs` times, printing one line per run.
pub async fn run_case_by_id(paths: &EvalPaths, case_id: &str, runs: u32) -> Result<()> {
    let case_path = paths.case_file(case_id);
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    info!(case_id, runs, squad = case.is_squad(), "starting runs");

    for run_num in 1..=runs {
        debug!(run_num, "starting run");
        let run = run_case(&paths.results, &case_path, &case)
            .await
            .with_context(|| format!("run {run_num} of case {case_id}"))?;
        println!(
            "run: case={} eval_run_id={} outcome={:?} results={}",
            case_id,
            run.eval_run_id,
            run.outcome,
            run.results_dir.display()
        );
    }
    Ok(())
}

/// Print the aggregated summary as text lines or as JSON.
pub fn report_case(paths: &EvalPaths, case_id: &str, json: bool) -> Result<()> {
    let (summary, warnings) = aggregate(&paths.results.join(case_id))?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    if json {
        let payload = serde_json::to_string_pretty(&summary).context("serialize report")?;
        println!("{payload}");
    } else {
        print_summary(case_id, &summary);
    }
    Ok(())
}

fn print_summary(case_id: &str, summary: &ReportSummary) {
    println!("report: case={} runs={}", case_id, summary.runs);
    println!(
        "report: success={} fail={} frozen={} error={}",
        summary.success, summary.fail, summary.frozen, summary.error
    );
    if let Some(avg) = summary.avg_duration_secs {
        println!("report: avg_duration_secs={avg:.2}");
    }
    if let Some(avg) = summary.avg_anomaly_score {
        println!("report: avg_anomaly_score={avg:.3}");
    }
    for (label, rate) in &summary.check_pass_rates {
        println!("report: check {} {}/{}", label, rate.passed, rate.total);
    }
}

/// Remove all captured runs for a case.
pub fn clean_case(paths: &EvalPaths, case_id: &str) -> Result<()> {
    let case_results = paths.results.join(case_id);
    let removed = case_results.exists();
    if removed {
        fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }
    println!(
        "clean: case={} results={} removed={}",
        case_id,
        case_results.display(),
        removed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_live_under_the_harness_dir() {
        let paths = EvalPaths::new(Path::new("/repo"));
        assert_eq!(paths.cases, PathBuf::from("/repo/mission-eval/cases"));
        assert_eq!(
            paths.case_file("gated-trade"),
            PathBuf::from("/repo/mission-eval/cases/gated-trade.toml")
        );
    }

    #[test]
    fn clean_removes_case_results_only() {
        let temp = tempdir().expect("tempdir");
        let paths = EvalPaths::new(temp.path());
        fs::create_dir_all(paths.results.join("a/eval-1")).expect("a");
        fs::create_dir_all(paths.results.join("b/eval-1")).expect("b");

        clean_case(&paths, "a").expect("clean");

        assert!(!paths.results.join("a").exists());
        assert!(paths.results.join("b/eval-1").exists());
    }

    #[tokio::test]
    async fn unknown_case_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let paths = EvalPaths::new(temp.path());
        let err = run_case_by_id(&paths, "absent", 1)
            .await
            .expect_err("missing case");
        assert!(err.to_string().contains("case absent not found"));
    }
}
