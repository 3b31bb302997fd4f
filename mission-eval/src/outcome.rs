use serde::{Deserialize, Serialize};

use mission::core::types::MissionResult;

use crate::judge::Judgment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Fail,
    /// Checks failed and the anomaly sidecar froze the agent.
    Frozen,
    /// Checks failed and the mission never reached a skill.
    Error,
}

pub fn classify_outcome(result: &MissionResult, frozen: bool, judgment: &Judgment) -> Outcome {
    if judgment.all_passed() {
        Outcome::Success
    } else if frozen {
        Outcome::Frozen
    } else if !result.is_success() && result.step_results.is_empty() {
        Outcome::Error
    } else {
        Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::CheckOutcome;
    use mission::core::types::{MissionStatus, SkillExecutionResult};

    fn judgment(pass: bool) -> Judgment {
        Judgment {
            checks: vec![CheckOutcome::LedgerSteps {
                expected: 1,
                actual: if pass { 1 } else { 0 },
                passed: pass,
            }],
        }
    }

    fn result(status: MissionStatus, steps: usize) -> MissionResult {
        MissionResult {
            status,
            final_output: None,
            reason: None,
            failed_skills: Vec::new(),
            step_results: vec![SkillExecutionResult::failed("x", 1); steps],
            total_execution_time_ms: 1,
        }
    }

    #[test]
    fn success_when_checks_pass() {
        let outcome = classify_outcome(&result(MissionStatus::Failed, 1), true, &judgment(true));
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn fail_when_checks_fail() {
        let outcome = classify_outcome(&result(MissionStatus::Success, 1), false, &judgment(false));
        assert_eq!(outcome, Outcome::Fail);
    }

    #[test]
    fn frozen_takes_precedence_over_error() {
        let outcome = classify_outcome(&result(MissionStatus::Failed, 0), true, &judgment(false));
        assert_eq!(outcome, Outcome::Frozen);
    }

    #[test]
    fn error_when_nothing_ran() {
        let outcome = classify_outcome(&result(MissionStatus::Failed, 0), false, &judgment(false));
        assert_eq!(outcome, Outcome::Error);
    }
}
