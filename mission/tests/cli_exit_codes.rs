//! CLI tests for `mission` commands.
//!
//! Spawns the mission binary against the simulated skill runtime and checks
//! exit codes and the JSON printed on stdout.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

use mission::exit_codes;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

fn write_mission(dir: &Path) {
    write(
        dir,
        "mission.json",
        r#"{"id":"cli-1","objective":"grow audience","context":{"topic":"solana"}}"#,
    );
}

fn write_dna(dir: &Path, skills: &[&str]) {
    let manifest: Vec<Value> = skills
        .iter()
        .map(|skill| serde_json::json!({ "skill_id": skill }))
        .collect();
    let dna = serde_json::json!({ "skills_manifest": manifest });
    write(dir, "dna.json", &dna.to_string());
}

fn mission_cmd(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mission"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn mission")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

#[test]
fn successful_run_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write_dna(temp.path(), &["multi_source_research", "seo_content_optimizer"]);

    let output = mission_cmd(
        temp.path(),
        &[
            "run",
            "--dna",
            "dna.json",
            "--mission",
            "mission.json",
            "--ledger-out",
            "out/ledger.json",
        ],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let report = stdout_json(&output);
    assert_eq!(report["mission"]["status"], "SUCCESS");
    assert_eq!(report["anomaly"]["status"], "SAFE");

    let ledger: Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join("out/ledger.json")).expect("ledger file"),
    )
    .expect("ledger json");
    assert_eq!(ledger["stats"]["total_steps"], 2);
}

#[test]
fn unknown_skill_exits_mission_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write_dna(temp.path(), &["multi_source_research", "teleport"]);

    let output = mission_cmd(
        temp.path(),
        &["run", "--dna", "dna.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::MISSION_FAILED));
    let report = stdout_json(&output);
    assert_eq!(report["mission"]["status"], "FAILED");
    assert_eq!(report["mission"]["reason"], "Failed skills: teleport");
    assert_eq!(report["anomaly"]["status"], "WARNING");
}

/// A lone trade is blocked by the geometry and then frozen by the sidecar.
#[test]
fn unsupervised_trade_exits_frozen() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write_dna(temp.path(), &["flash_arbitrage"]);

    let output = mission_cmd(
        temp.path(),
        &["run", "--dna", "dna.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::FROZEN));
    let report = stdout_json(&output);
    assert_eq!(report["mission"]["status"], "FAILED");
    assert_eq!(report["anomaly"]["status"], "FROZEN");
}

#[test]
fn plan_reports_blocked_transition_and_warning() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write_dna(temp.path(), &["flash_arbitrage", "competitive_analysis"]);

    let output = mission_cmd(
        temp.path(),
        &["plan", "--dna", "dna.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let plan = stdout_json(&output);
    assert_eq!(plan["steps"][0]["vertex"], "ARBITRAGE_EXECUTED");
    assert_eq!(plan["steps"][0]["valid"], false);
    assert_eq!(plan["steps"][1]["valid"], true);
    assert_eq!(plan["warnings"].as_array().expect("warnings").len(), 1);
}

#[test]
fn squad_run_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write(
        temp.path(),
        "squad.json",
        r#"[
            {"id":"lead","role":"Growth Lead","skills":{"skills_manifest":[{"skill_id":"competitive_analysis"}]}},
            {"id":"social","role":"Social","skills":{"skills_manifest":[{"skill_id":"social_media_campaign"}]}}
        ]"#,
    );

    let output = mission_cmd(
        temp.path(),
        &["squad", "--squad", "squad.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let report = stdout_json(&output);
    assert_eq!(report["mission"]["status"], "SUCCESS");
    assert_eq!(report["mission"]["step_results"].as_array().expect("steps").len(), 2);
}

#[test]
fn score_exits_frozen_for_trade_without_research() {
    let temp = tempfile::tempdir().expect("tempdir");
    write(
        temp.path(),
        "actions.json",
        r#"[{"skill_id":"flash_arbitrage","timestamp":"2026-01-01T00:00:00Z","features":[0.1]}]"#,
    );

    let output = mission_cmd(temp.path(), &["score", "--actions", "actions.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::FROZEN));
    let report = stdout_json(&output);
    assert_eq!(report["score"], 0.95);
    assert_eq!(report["status"], "FROZEN");
}

#[test]
fn missing_input_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());

    let output = mission_cmd(
        temp.path(),
        &["run", "--dna", "absent.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.json"));
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_mission(temp.path());
    write_dna(temp.path(), &["competitive_analysis"]);
    write(temp.path(), "mission.toml", "step_timeout_secs = 0\n");

    let output = mission_cmd(
        temp.path(),
        &["run", "--dna", "dna.json", "--mission", "mission.json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}
