//! Case-scripted skill runtime.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use mission::core::types::{ExecutionMetadata, SkillExecutionResult};
use mission::io::skills::{SimulatedSkillExecutor, SkillExecutor};

use crate::case::{ScriptedOutcome, ScriptedSkill};

/// Plays back `[[skills]]` entries; anything unscripted goes to the simulator.
#[derive(Debug, Default)]
pub struct CaseSkillExecutor {
    scripted: HashMap<String, ScriptedSkill>,
    fallback: SimulatedSkillExecutor,
}

impl CaseSkillExecutor {
    pub fn new(skills: &[ScriptedSkill]) -> Self {
        Self {
            scripted: skills
                .iter()
                .map(|skill| (skill.id.clone(), skill.clone()))
                .collect(),
            fallback: SimulatedSkillExecutor,
        }
    }
}

#[async_trait]
impl SkillExecutor for CaseSkillExecutor {
    async fn execute_skill(
        &self,
        skill_id: &str,
        parameters: &Map<String, Value>,
        previous: Option<&Value>,
    ) -> Result<SkillExecutionResult> {
        let Some(skill) = self.scripted.get(skill_id) else {
            return self
                .fallback
                .execute_skill(skill_id, parameters, previous)
                .await;
        };
        if skill.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(skill.delay_ms)).await;
        }
        debug!(skill_id, outcome = ?skill.outcome, "scripted skill");
        match skill.outcome {
            ScriptedOutcome::Success => Ok(SkillExecutionResult::succeeded(
                skill.data.clone().unwrap_or(Value::Null),
                ExecutionMetadata {
                    execution_time_ms: skill.delay_ms,
                    tools_called: skill.tools.clone(),
                    tokens_used: None,
                },
            )),
            ScriptedOutcome::Fail => Ok(SkillExecutionResult::failed(
                skill
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("{skill_id} failed")),
                skill.delay_ms,
            )),
            ScriptedOutcome::Error => Err(anyhow!(
                "{}",
                skill.error.as_deref().unwrap_or("scripted error")
            )),
        }
    }
}
