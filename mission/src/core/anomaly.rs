//! Rule-based anomaly scoring over a short window of agent actions.
//!
//! Only the most recent action is judged; the rest of the window is consulted
//! to see whether an action was preceded by research.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::catalog::SkillCatalog;

pub const FREEZE_THRESHOLD: f64 = 0.8;
pub const WARNING_THRESHOLD: f64 = 0.3;

const UNSUPERVISED_ACTION_SCORE: f64 = 0.95;
const UNKNOWN_REGION_SCORE: f64 = 0.6;
const HOT_FEATURE: f64 = 0.9;
const HOT_FEATURE_PENALTY: f64 = 0.2;
const FEATURE_FLOOR: f64 = 0.1;

/// One observed step, with normalized signals in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub skill_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Safe,
    Warning,
    Frozen,
}

impl SafetyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyStatus::Safe => "SAFE",
            SafetyStatus::Warning => "WARNING",
            SafetyStatus::Frozen => "FROZEN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    catalog: SkillCatalog,
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self::new(SkillCatalog::default())
    }
}

impl AnomalyScorer {
    pub fn new(catalog: SkillCatalog) -> Self {
        Self { catalog }
    }

    /// Score the window in `[0, 1]`; an empty window scores 0.
    pub fn analyze_topology(&self, history: &[AgentAction]) -> f64 {
        let Some(last) = history.last() else {
            return 0.0;
        };

        if self.catalog.is_action(&last.skill_id) {
            let researched = history
                .iter()
                .any(|action| self.catalog.is_research(&action.skill_id));
            if !researched {
                return UNSUPERVISED_ACTION_SCORE;
            }
        } else if !self.catalog.is_baseline(&last.skill_id) {
            return UNKNOWN_REGION_SCORE;
        }

        let hot = last
            .features
            .iter()
            .filter(|value| **value > HOT_FEATURE)
            .count();
        (HOT_FEATURE_PENALTY * hot as f64 + FEATURE_FLOOR).min(1.0)
    }

    pub fn should_freeze(&self, score: f64) -> bool {
        score > FREEZE_THRESHOLD
    }

    pub fn status(&self, score: f64) -> SafetyStatus {
        if score > FREEZE_THRESHOLD {
            SafetyStatus::Frozen
        } else if score > WARNING_THRESHOLD {
            SafetyStatus::Warning
        } else {
            SafetyStatus::Safe
        }
    }
}
