//! Test-only skill executors with scripted outcomes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::types::{ExecutionMetadata, SkillExecutionResult};
use crate::io::skills::SkillExecutor;

#[derive(Debug, Clone)]
enum Scripted {
    Result(SkillExecutionResult),
    Error(String),
}

/// Returns a fixed outcome per skill id and records every invocation.
///
/// Unscripted skills fail with `Unknown skill: <id>`.
#[derive(Debug, Default)]
pub struct ScriptedSkillExecutor {
    script: HashMap<String, Scripted>,
    calls: Mutex<Vec<Invocation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub skill_id: String,
    pub parameters: Map<String, Value>,
    pub previous: Option<Value>,
}

impl ScriptedSkillExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, skill_id: &str, result: SkillExecutionResult) -> Self {
        self.script
            .insert(skill_id.to_string(), Scripted::Result(result));
        self
    }

    /// Successful result carrying `data` with default metadata.
    pub fn with_data(self, skill_id: &str, data: Value) -> Self {
        self.with_result(
            skill_id,
            SkillExecutionResult::succeeded(data, ExecutionMetadata::default()),
        )
    }

    pub fn with_error(mut self, skill_id: &str, message: &str) -> Self {
        self.script
            .insert(skill_id.to_string(), Scripted::Error(message.to_string()));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Skill ids in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|invocation| invocation.skill_id)
            .collect()
    }

    /// `previous` argument of each invocation, in order.
    pub fn previous_inputs(&self) -> Vec<Option<Value>> {
        self.invocations()
            .into_iter()
            .map(|invocation| invocation.previous)
            .collect()
    }
}

#[async_trait]
impl SkillExecutor for ScriptedSkillExecutor {
    async fn execute_skill(
        &self,
        skill_id: &str,
        parameters: &Map<String, Value>,
        previous: Option<&Value>,
    ) -> Result<SkillExecutionResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Invocation {
                skill_id: skill_id.to_string(),
                parameters: parameters.clone(),
                previous: previous.cloned(),
            });
        }
        match self.script.get(skill_id) {
            Some(Scripted::Result(result)) => Ok(result.clone()),
            Some(Scripted::Error(message)) => Err(anyhow!(message.clone())),
            None => Err(anyhow!("Unknown skill: {skill_id}")),
        }
    }
}

/// Sleeps before succeeding; used to exercise step timeouts.
#[derive(Debug, Clone)]
pub struct SlowSkillExecutor {
    delay: Duration,
}

impl SlowSkillExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SkillExecutor for SlowSkillExecutor {
    async fn execute_skill(
        &self,
        skill_id: &str,
        _parameters: &Map<String, Value>,
        _previous: Option<&Value>,
    ) -> Result<SkillExecutionResult> {
        tokio::time::sleep(self.delay).await;
        Ok(SkillExecutionResult::succeeded(
            Value::String(skill_id.to_string()),
            ExecutionMetadata::default(),
        ))
    }
}
