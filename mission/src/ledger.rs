//! Append-only execution ledger with checkpoints.
//!
//! Entries are never mutated or removed once appended (except through
//! [`ExecutionLedger::clear`]). Checkpoints snapshot the latest entry so a
//! caller can resume from it without recomputation; "rollback" is a lookup
//! and never truncates history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::anomaly::AgentAction;
use crate::core::types::SkillExecutionResult;

/// Boltzmann constant, J/K.
const BOLTZMANN: f64 = 1.380649e-23;
/// Reference temperature, K.
const TEMPERATURE: f64 = 300.0;
const MICROJOULES_PER_JOULE: f64 = 1e6;

const CHECKPOINT_SUFFIX_LEN: usize = 9;

/// One recorded step attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeState {
    pub step_id: String,
    pub step_index: usize,
    pub timestamp: DateTime<Utc>,
    /// SHA-256 hex of the serialized input data.
    pub input_entropy: String,
    #[serde(default)]
    pub input_data: Option<Value>,
    pub skill_id: String,
    pub parameters: Map<String, Value>,
    pub output_state: SkillExecutionResult,
    pub bits_erased: u64,
    /// Derived on append.
    #[serde(default)]
    pub energy_cost_microjoules: f64,
    /// Derived on append.
    #[serde(default)]
    pub reversible: bool,
}

impl ComputeState {
    /// Build an entry for a step. `energy_cost_microjoules` and `reversible`
    /// are filled in by [`ExecutionLedger::add_step`].
    pub fn new(
        step_id: impl Into<String>,
        step_index: usize,
        skill_id: impl Into<String>,
        parameters: Map<String, Value>,
        input_data: Option<Value>,
        output_state: SkillExecutionResult,
        bits_erased: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            step_index,
            timestamp: Utc::now(),
            input_entropy: input_entropy(input_data.as_ref()),
            input_data,
            skill_id: skill_id.into(),
            parameters,
            output_state,
            bits_erased,
            energy_cost_microjoules: 0.0,
            reversible: true,
        }
    }
}

/// SHA-256 hex digest of the JSON rendering of `input` (`null` when absent).
pub fn input_entropy(input: Option<&Value>) -> String {
    let rendered = input.map_or_else(|| "null".to_string(), Value::to_string);
    hex::encode(Sha256::digest(rendered.as_bytes()))
}

/// Bits consumed by a step whose input produced no output.
pub fn bits_for_failed_input(input: Option<&Value>) -> u64 {
    let rendered = input.map_or_else(|| "null".to_string(), Value::to_string);
    8 * rendered.len() as u64
}

/// Landauer bound for erasing `bits` at the reference temperature, in µJ.
pub fn landauer_cost_microjoules(bits: u64) -> f64 {
    bits as f64 * BOLTZMANN * TEMPERATURE * std::f64::consts::LN_2 * MICROJOULES_PER_JOULE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub label: String,
    pub state_snapshot: ComputeState,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_steps: usize,
    pub reversible_steps: usize,
    pub total_bits_erased: u64,
    pub total_energy_microjoules: f64,
    pub landauer_efficiency: f64,
    pub entropy_waste_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub result: Option<SkillExecutionResult>,
    pub stats: LedgerStats,
    pub history: Vec<ComputeState>,
}

#[derive(Debug, Default)]
pub struct ExecutionLedger {
    history: Vec<ComputeState>,
    checkpoints: HashMap<String, Checkpoint>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, deriving its energy cost and reversibility.
    pub fn add_step(&mut self, mut entry: ComputeState) {
        if entry.bits_erased > 0 {
            entry.energy_cost_microjoules = landauer_cost_microjoules(entry.bits_erased);
            entry.reversible = false;
        } else {
            entry.energy_cost_microjoules = 0.0;
            entry.reversible = true;
        }
        debug!(
            step_id = %entry.step_id,
            skill_id = %entry.skill_id,
            bits_erased = entry.bits_erased,
            reversible = entry.reversible,
            "ledger append"
        );
        self.history.push(entry);
    }

    /// Snapshot the latest entry under a fresh id. On an empty ledger the id is
    /// still returned but nothing is stored.
    pub fn create_checkpoint(&mut self, label: &str) -> String {
        let checkpoint_id = new_checkpoint_id();
        let Some(latest) = self.history.last() else {
            warn!(%label, "checkpoint requested on empty ledger");
            return checkpoint_id;
        };
        let checkpoint = Checkpoint {
            checkpoint_id: checkpoint_id.clone(),
            label: label.to_string(),
            state_snapshot: latest.clone(),
            timestamp: Utc::now(),
        };
        debug!(%checkpoint_id, %label, step_id = %latest.step_id, "checkpoint created");
        self.checkpoints.insert(checkpoint_id.clone(), checkpoint);
        checkpoint_id
    }

    /// Snapshot stored under `checkpoint_id`. History is left untouched.
    pub fn rollback_to(&self, checkpoint_id: &str) -> Option<&ComputeState> {
        self.checkpoints
            .get(checkpoint_id)
            .map(|checkpoint| &checkpoint.state_snapshot)
    }

    /// First entry recorded for `step_id`. History is left untouched.
    pub fn rollback_to_step(&self, step_id: &str) -> Option<&ComputeState> {
        self.history.iter().find(|entry| entry.step_id == step_id)
    }

    pub fn checkpoint(&self, checkpoint_id: &str) -> Option<&Checkpoint> {
        self.checkpoints.get(checkpoint_id)
    }

    pub fn history(&self) -> Vec<ComputeState> {
        self.history.clone()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn stats(&self) -> LedgerStats {
        let total_steps = self.history.len();
        let reversible_steps = self.history.iter().filter(|entry| entry.reversible).count();
        let landauer_efficiency = if total_steps == 0 {
            0.0
        } else {
            100.0 * reversible_steps as f64 / total_steps as f64
        };
        LedgerStats {
            total_steps,
            reversible_steps,
            total_bits_erased: self.history.iter().map(|entry| entry.bits_erased).sum(),
            total_energy_microjoules: self
                .history
                .iter()
                .map(|entry| entry.energy_cost_microjoules)
                .sum(),
            landauer_efficiency,
            entropy_waste_percent: 100.0 - landauer_efficiency,
        }
    }

    /// Latest output plus stats and the full history.
    pub fn synthesize(&self) -> Synthesis {
        Synthesis {
            result: self.history.last().map(|entry| entry.output_state.clone()),
            stats: self.stats(),
            history: self.history(),
        }
    }

    /// Action stream for anomaly scoring, oldest first.
    pub fn actions(&self) -> Vec<AgentAction> {
        self.history.iter().map(AgentAction::from_compute_state).collect()
    }

    /// Discard all history and checkpoints.
    ///
    /// Breaks the append-only guarantee. Test setup only.
    pub fn clear(&mut self) {
        self.history.clear();
        self.checkpoints.clear();
    }
}

impl AgentAction {
    /// Features `[latency, failure, tool load, token load]`, each in `[0, 1]`.
    pub fn from_compute_state(entry: &ComputeState) -> Self {
        let metadata = &entry.output_state.metadata;
        let latency = (metadata.execution_time_ms as f64 / 1000.0).min(1.0);
        let failure = if entry.output_state.success { 0.0 } else { 1.0 };
        let tool_load = (metadata.tools_called.len() as f64 / 10.0).min(1.0);
        let token_load = metadata
            .tokens_used
            .map_or(0.0, |tokens| (tokens as f64 / 4000.0).min(1.0));
        Self {
            skill_id: entry.skill_id.clone(),
            timestamp: entry.timestamp,
            features: vec![latency, failure, tool_load, token_load],
        }
    }
}

/// `checkpoint_<unix millis>_<9 base-36 chars>`.
fn new_checkpoint_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CHECKPOINT_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.gen_range(0..36), 36))
        .collect();
    format!("checkpoint_{}_{}", Utc::now().timestamp_millis(), suffix)
}
