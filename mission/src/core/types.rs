//! Shared deterministic types for the mission core.
//!
//! These types define stable contracts between the orchestrator, the
//! validator, the ledger and the skill-execution seam. They carry no I/O and
//! serialize to stable JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable input to one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub objective: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Wall-clock deadline; caps every step's time budget when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl Mission {
    pub fn new(id: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            objective: objective.into(),
            context: Map::new(),
            priority: None,
            deadline: None,
        }
    }
}

/// One entry of an agent's skills manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub skill_id: String,
}

/// Capability manifest plus optional reasoning protocol for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentDna {
    pub skills_manifest: Vec<SkillRef>,
    #[serde(default)]
    pub reasoning_protocol: Option<String>,
}

impl AgentDna {
    /// Build a manifest from skill ids with no reasoning protocol.
    pub fn from_skills<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skills_manifest: skills
                .into_iter()
                .map(|skill_id| SkillRef {
                    skill_id: skill_id.into(),
                })
                .collect(),
            reasoning_protocol: None,
        }
    }
}

/// Squad member: a role label and the agent's own manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadMember {
    pub id: String,
    pub role: String,
    pub skills: AgentDna,
}

/// A single planned invocation of a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Sequential id starting at 1.
    pub id: u32,
    pub skill_id: String,
    pub parameters: Map<String, Value>,
    /// Ids of steps that must complete before this one.
    pub dependencies: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub execution_time_ms: u64,
    /// Tools invoked by the skill, in call order.
    pub tools_called: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

/// Outcome of one skill execution (real or synthetic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub compliance_failed: bool,
    #[serde(default)]
    pub metadata: ExecutionMetadata,
}

impl SkillExecutionResult {
    pub fn succeeded(data: Value, metadata: ExecutionMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            compliance_failed: false,
            metadata,
        }
    }

    /// Failed result with no data and the given error message.
    pub fn failed(error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            compliance_failed: false,
            metadata: ExecutionMetadata {
                execution_time_ms,
                tools_called: Vec::new(),
                tokens_used: None,
            },
        }
    }
}

/// Terminal status of one orchestration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Success,
    Failed,
    Partial,
}

/// Terminal artifact of one orchestration call. Never mutated after return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResult {
    pub status: MissionStatus,
    pub final_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Skill ids of every failed step, in execution order.
    #[serde(default)]
    pub failed_skills: Vec<String>,
    pub step_results: Vec<SkillExecutionResult>,
    pub total_execution_time_ms: u64,
}

impl MissionResult {
    pub fn is_success(&self) -> bool {
        self.status == MissionStatus::Success
    }
}
