//! Case file parsing and validation.
//!
//! Cases are TOML files describing an agent (or squad), a mission, scripted
//! skill outcomes and the checks to judge the run by.
//! See `mission-eval/cases/` for examples.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::{Map, Value};

use mission::core::anomaly::SafetyStatus;
use mission::core::types::{AgentDna, Mission, MissionStatus, SquadMember};

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub case: CaseMeta,
    #[serde(default)]
    pub agent: Option<AgentSpec>,
    #[serde(default)]
    pub squad: Vec<SquadSpec>,
    pub mission: MissionSpec,
    #[serde(default)]
    pub config: CaseConfig,
    #[serde(default)]
    pub skills: Vec<ScriptedSkill>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

/// Case metadata.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AgentSpec {
    pub skills: Vec<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl AgentSpec {
    pub fn dna(&self) -> AgentDna {
        let mut dna = AgentDna::from_skills(self.skills.iter().cloned());
        dna.reasoning_protocol = self.protocol.clone();
        dna
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SquadSpec {
    pub id: String,
    pub role: String,
    pub skills: Vec<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl SquadSpec {
    pub fn member(&self) -> SquadMember {
        let mut dna = AgentDna::from_skills(self.skills.iter().cloned());
        dna.reasoning_protocol = self.protocol.clone();
        SquadMember {
            id: self.id.clone(),
            role: self.role.clone(),
            skills: dna,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MissionSpec {
    pub id: String,
    pub objective: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl MissionSpec {
    pub fn mission(&self) -> Mission {
        let mut mission = Mission::new(self.id.clone(), self.objective.clone());
        mission.context = self.context.clone();
        mission.priority = self.priority.clone();
        mission
    }
}

/// Mission configuration overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CaseConfig {
    /// Per-step timeout in milliseconds.
    pub step_timeout_ms: Option<u64>,
    /// Fixed transition weights `[latency_ms, cost, compliance_score]`.
    pub fixed_weights: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedOutcome {
    #[default]
    Success,
    /// Skill returns a result with `success = false`.
    Fail,
    /// Skill call errors out.
    Error,
}

/// Scripted behavior for one skill. Unscripted skills use the simulated runtime.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScriptedSkill {
    pub id: String,
    #[serde(default)]
    pub outcome: ScriptedOutcome,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Verification check applied to the finished mission.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// Mission status equals `status`.
    StatusIs { status: MissionStatus },
    /// Mission reason contains `text`.
    ReasonContains { text: String },
    /// Some ledger entry for `skill` succeeded.
    StepSucceeded { skill: String },
    /// Some ledger entry for `skill` failed.
    StepFailed { skill: String },
    /// The ledger holds exactly `count` entries.
    LedgerSteps { count: usize },
    /// The final output is an object with `key`.
    FinalOutputHas { key: String },
    /// The anomaly sidecar reports `status` for the ledger's actions.
    AnomalyIs { status: SafetyStatus },
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case: CaseFile =
            toml::from_str(&contents).with_context(|| format!("parse case {}", path.display()))?;
        case.validate()
            .with_context(|| format!("validate case {}", path.display()))?;
        Ok(case)
    }

    #[cfg(test)]
    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        match (&self.agent, self.squad.is_empty()) {
            (Some(_), false) => bail!("case must define either [agent] or [[squad]], not both"),
            (None, true) => bail!("case must define [agent] or [[squad]]"),
            _ => {}
        }
        if let Some(agent) = &self.agent
            && agent.skills.is_empty()
        {
            bail!("agent.skills must be a non-empty array");
        }
        for (index, member) in self.squad.iter().enumerate() {
            if member.id.trim().is_empty() || member.role.trim().is_empty() {
                bail!("squad[{index}]: id and role must be non-empty");
            }
        }
        if self.mission.id.trim().is_empty() {
            bail!("mission.id must be non-empty");
        }
        if self.config.step_timeout_ms == Some(0) {
            bail!("config.step_timeout_ms must be > 0");
        }
        let mut scripted = HashSet::new();
        for skill in &self.skills {
            if !scripted.insert(skill.id.as_str()) {
                bail!("skills: duplicate id {}", skill.id);
            }
        }
        if self.checks.is_empty() {
            bail!("checks must be a non-empty array");
        }
        for (index, check) in self.checks.iter().enumerate() {
            check
                .validate()
                .with_context(|| format!("checks[{}] invalid", index))?;
        }
        Ok(())
    }

    pub fn is_squad(&self) -> bool {
        !self.squad.is_empty()
    }
}

impl Check {
    fn validate(&self) -> Result<()> {
        match self {
            Check::ReasonContains { text } if text.is_empty() => {
                bail!("reason_contains.text must be non-empty");
            }
            Check::StepSucceeded { skill } | Check::StepFailed { skill } if skill.is_empty() => {
                bail!("step check skill must be non-empty");
            }
            Check::FinalOutputHas { key } if key.is_empty() => {
                bail!("final_output_has.key must be non-empty");
            }
            _ => {}
        }
        Ok(())
    }
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if id.contains('/') || id.contains('\\') {
        bail!("case.id must not contain path separators");
    }
    if id.contains("..") {
        bail!("case.id must not contain '..'");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}
