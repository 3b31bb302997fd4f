//! Check evaluation.
//!
//! Judges a finished mission against the case's checks using the mission
//! result, the ledger history and the anomaly verdict.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use mission::core::anomaly::SafetyStatus;
use mission::core::types::{MissionResult, MissionStatus};
use mission::ledger::ComputeState;

use crate::case::Check;

/// Everything the checks can look at after a run.
#[derive(Debug)]
pub struct Observation<'a> {
    pub result: &'a MissionResult,
    pub history: &'a [ComputeState],
    pub anomaly: SafetyStatus,
}

/// Collected check outcomes for a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Judgment {
    pub checks: Vec<CheckOutcome>,
}

impl Judgment {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(CheckOutcome::passed)
    }
}

/// Result of evaluating a single check.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckOutcome {
    StatusIs {
        expected: MissionStatus,
        actual: MissionStatus,
        passed: bool,
    },
    ReasonContains {
        text: String,
        reason: Option<String>,
        passed: bool,
    },
    StepSucceeded {
        skill: String,
        passed: bool,
    },
    StepFailed {
        skill: String,
        passed: bool,
    },
    LedgerSteps {
        expected: usize,
        actual: usize,
        passed: bool,
    },
    FinalOutputHas {
        key: String,
        passed: bool,
    },
    AnomalyIs {
        expected: SafetyStatus,
        actual: SafetyStatus,
        passed: bool,
    },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        match self {
            CheckOutcome::StatusIs { passed, .. }
            | CheckOutcome::ReasonContains { passed, .. }
            | CheckOutcome::StepSucceeded { passed, .. }
            | CheckOutcome::StepFailed { passed, .. }
            | CheckOutcome::LedgerSteps { passed, .. }
            | CheckOutcome::FinalOutputHas { passed, .. }
            | CheckOutcome::AnomalyIs { passed, .. } => *passed,
        }
    }

    /// Stable label used to group outcomes across runs.
    pub fn label(&self) -> String {
        match self {
            CheckOutcome::StatusIs { expected, .. } => format!("status_is({expected:?})"),
            CheckOutcome::ReasonContains { text, .. } => format!("reason_contains({text})"),
            CheckOutcome::StepSucceeded { skill, .. } => format!("step_succeeded({skill})"),
            CheckOutcome::StepFailed { skill, .. } => format!("step_failed({skill})"),
            CheckOutcome::LedgerSteps { expected, .. } => format!("ledger_steps({expected})"),
            CheckOutcome::FinalOutputHas { key, .. } => format!("final_output_has({key})"),
            CheckOutcome::AnomalyIs { expected, .. } => {
                format!("anomaly_is({})", expected.as_str())
            }
        }
    }
}

/// Evaluate all checks against one observation.
#[instrument(skip_all, fields(check_count = checks.len()))]
pub fn run_checks(checks: &[Check], observation: &Observation<'_>) -> Judgment {
    let outcomes = checks
        .iter()
        .map(|check| evaluate(check, observation))
        .collect::<Vec<_>>();
    debug!(
        passed = outcomes.iter().filter(|outcome| outcome.passed()).count(),
        "checks evaluated"
    );
    Judgment { checks: outcomes }
}

fn evaluate(check: &Check, observation: &Observation<'_>) -> CheckOutcome {
    let result = observation.result;
    match check {
        Check::StatusIs { status } => CheckOutcome::StatusIs {
            expected: *status,
            actual: result.status,
            passed: result.status == *status,
        },
        Check::ReasonContains { text } => CheckOutcome::ReasonContains {
            text: text.clone(),
            reason: result.reason.clone(),
            passed: result
                .reason
                .as_deref()
                .is_some_and(|reason| reason.contains(text.as_str())),
        },
        Check::StepSucceeded { skill } => CheckOutcome::StepSucceeded {
            skill: skill.clone(),
            passed: observation
                .history
                .iter()
                .any(|entry| entry.skill_id == *skill && entry.output_state.success),
        },
        Check::StepFailed { skill } => CheckOutcome::StepFailed {
            skill: skill.clone(),
            passed: observation
                .history
                .iter()
                .any(|entry| entry.skill_id == *skill && !entry.output_state.success),
        },
        Check::LedgerSteps { count } => CheckOutcome::LedgerSteps {
            expected: *count,
            actual: observation.history.len(),
            passed: observation.history.len() == *count,
        },
        Check::FinalOutputHas { key } => CheckOutcome::FinalOutputHas {
            key: key.clone(),
            passed: result
                .final_output
                .as_ref()
                .and_then(|output| output.as_object())
                .is_some_and(|object| object.contains_key(key.as_str())),
        },
        Check::AnomalyIs { status } => CheckOutcome::AnomalyIs {
            expected: *status,
            actual: observation.anomaly,
            passed: observation.anomaly == *status,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission::core::types::SkillExecutionResult;
    use serde_json::{Map, json};

    fn entry(skill_id: &str, success: bool) -> ComputeState {
        let result = if success {
            SkillExecutionResult::succeeded(json!({"ok": true}), Default::default())
        } else {
            SkillExecutionResult::failed("boom", 1)
        };
        ComputeState::new(
            format!("m#{skill_id}"),
            0,
            skill_id,
            Map::new(),
            None,
            result,
            if success { 0 } else { 8 },
        )
    }

    fn result() -> MissionResult {
        MissionResult {
            status: MissionStatus::Failed,
            final_output: None,
            reason: Some("Failed skills: risk_model".to_string()),
            failed_skills: vec!["risk_model".to_string()],
            step_results: Vec::new(),
            total_execution_time_ms: 3,
        }
    }

    #[test]
    fn evaluates_status_reason_and_ledger() {
        let result = result();
        let history = vec![entry("price_oracle", true), entry("risk_model", false)];
        let observation = Observation {
            result: &result,
            history: &history,
            anomaly: SafetyStatus::Warning,
        };
        let checks = vec![
            Check::StatusIs {
                status: MissionStatus::Failed,
            },
            Check::ReasonContains {
                text: "risk_model".to_string(),
            },
            Check::StepSucceeded {
                skill: "price_oracle".to_string(),
            },
            Check::StepFailed {
                skill: "risk_model".to_string(),
            },
            Check::LedgerSteps { count: 2 },
            Check::AnomalyIs {
                status: SafetyStatus::Warning,
            },
        ];

        let judgment = run_checks(&checks, &observation);
        assert!(judgment.all_passed(), "{judgment:?}");
    }

    #[test]
    fn failing_checks_are_reported() {
        let result = result();
        let observation = Observation {
            result: &result,
            history: &[],
            anomaly: SafetyStatus::Safe,
        };
        let checks = vec![
            Check::FinalOutputHas {
                key: "summary".to_string(),
            },
            Check::StepFailed {
                skill: "risk_model".to_string(),
            },
        ];

        let judgment = run_checks(&checks, &observation);
        assert!(!judgment.all_passed());
        assert_eq!(judgment.checks[0].label(), "final_output_has(summary)");
        assert!(!judgment.checks[1].passed());
    }
}
