//! Mission orchestration: plan, validate, execute and synthesize.
//!
//! One orchestration awaits each skill in turn. Every step outcome, including
//! steps blocked by the state geometry, is appended to the shared ledger in
//! plan order. The ledger lock is only taken for the append itself.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use crate::core::budget::step_budget;
use crate::core::catalog::SkillCatalog;
use crate::core::geometry::GeometryValidator;
use crate::core::invariants::{check_plan, validate_topology};
use crate::core::plan::parse_protocol;
use crate::core::schedule::{PlanError, topological_sort};
use crate::core::types::{
    AgentDna, ExecutionStep, Mission, MissionResult, MissionStatus, SkillExecutionResult,
    SquadMember,
};
use crate::core::vertex::{Simplex, StateVertex, render_simplex, simplex};
use crate::io::config::{MissionConfig, WeightPolicy};
use crate::io::skills::SkillExecutor;
use crate::ledger::{ComputeState, ExecutionLedger, bits_for_failed_input};

/// Ledger handle shared between orchestrations.
pub type SharedLedger = Arc<Mutex<ExecutionLedger>>;

const COORDINATOR_ROLES: [&str; 3] = ["Lead", "Manager", "Architect"];

/// One executed (or blocked) step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step_id: u32,
    pub skill_id: String,
    pub result: SkillExecutionResult,
}

pub struct Orchestrator<S: SkillExecutor> {
    executor: S,
    catalog: SkillCatalog,
    validator: GeometryValidator,
    weights: WeightPolicy,
    step_timeout: Duration,
    ledger: SharedLedger,
}

impl<S: SkillExecutor> Orchestrator<S> {
    /// Orchestrator with the reference tables, sampled weights and a fresh ledger.
    pub fn new(executor: S) -> Self {
        let config = MissionConfig::default();
        Self {
            executor,
            catalog: config.catalog,
            validator: GeometryValidator::default(),
            weights: config.weights,
            step_timeout: Duration::from_secs(config.step_timeout_secs),
            ledger: Arc::new(Mutex::new(ExecutionLedger::new())),
        }
    }

    /// Apply catalog, weights and step timeout from `config`.
    pub fn with_config(mut self, config: &MissionConfig) -> Self {
        self.catalog = config.catalog.clone();
        self.weights = config.weights.clone();
        self.step_timeout = config.step_timeout();
        self
    }

    pub fn with_validator(mut self, validator: GeometryValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_weights(mut self, weights: WeightPolicy) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn with_ledger(mut self, ledger: SharedLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn validator(&self) -> &GeometryValidator {
        &self.validator
    }

    pub fn weights(&self) -> &WeightPolicy {
        &self.weights
    }

    /// Steps selected by the agent's reasoning protocol.
    pub fn plan(&self, dna: &AgentDna, mission: &Mission) -> Vec<ExecutionStep> {
        let protocol = dna.reasoning_protocol.as_deref().unwrap_or_default();
        parse_protocol(protocol, &dna.skills_manifest, mission)
    }

    /// Run one agent against a mission. Never returns an error: failures are
    /// reported through `status` and `reason`.
    #[instrument(skip_all, fields(mission_id = %mission.id))]
    pub async fn orchestrate(&self, dna: &AgentDna, mission: &Mission) -> MissionResult {
        let started = Instant::now();
        info!(objective = %mission.objective, skills = dna.skills_manifest.len(), "orchestrating mission");
        match self.run_agent(dna, mission).await {
            Ok(outcomes) => {
                let result = conclude(mission, &outcomes, started, StatusRule::AllOrNothing);
                info!(status = ?result.status, steps = outcomes.len(), "mission finished");
                result
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "mission failed");
                MissionResult {
                    status: MissionStatus::Failed,
                    final_output: None,
                    reason: Some(format!("{err:#}")),
                    failed_skills: Vec::new(),
                    step_results: Vec::new(),
                    total_execution_time_ms: elapsed_ms(started),
                }
            }
        }
    }

    /// Run a two-tier squad. Coordinators see only the mission; each worker
    /// also sees the data of the most recent result produced before it.
    #[instrument(skip_all, fields(squad_id = %squad_id, mission_id = %mission.id))]
    pub async fn orchestrate_squad(
        &self,
        squad_id: &str,
        members: &[SquadMember],
        mission: &Mission,
    ) -> MissionResult {
        let started = Instant::now();
        let (coordinators, workers): (Vec<&SquadMember>, Vec<&SquadMember>) =
            members.iter().partition(|member| is_coordinator(&member.role));
        if coordinators.is_empty() {
            warn!("squad has no coordinators; running workers only");
        }
        info!(
            coordinators = coordinators.len(),
            workers = workers.len(),
            "orchestrating squad"
        );

        let mut outcomes: Vec<StepOutcome> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for coordinator in coordinators {
            debug!(member = %coordinator.id, role = %coordinator.role, "coordinator active");
            match self.run_agent(&coordinator.skills, mission).await {
                Ok(mut produced) => outcomes.append(&mut produced),
                Err(err) => errors.push(format!("{}: {err:#}", coordinator.id)),
            }
        }

        for worker in workers {
            debug!(member = %worker.id, role = %worker.role, "worker active");
            let upstream = outcomes
                .last()
                .and_then(|outcome| outcome.result.data.as_ref());
            let worker_mission = with_upstream(mission, upstream);
            match self.run_agent(&worker.skills, &worker_mission).await {
                Ok(mut produced) => outcomes.append(&mut produced),
                Err(err) => errors.push(format!("{}: {err:#}", worker.id)),
            }
        }

        let mut result = conclude(mission, &outcomes, started, StatusRule::Graded);
        if !errors.is_empty() {
            for error in &errors {
                warn!(%error, "squad member failed before execution");
            }
            if result.status == MissionStatus::Success {
                result.status = MissionStatus::Partial;
            }
            let member_errors = format!("Member errors: {}", errors.join("; "));
            result.reason = Some(match result.reason.take() {
                Some(reason) => format!("{reason}. {member_errors}"),
                None => member_errors,
            });
        }
        info!(status = ?result.status, steps = result.step_results.len(), "squad finished");
        result
    }

    /// Sort `plan` and execute it step by step against the working simplex.
    pub async fn execute_with_dependencies(
        &self,
        mission: &Mission,
        plan: &[ExecutionStep],
    ) -> Result<Vec<SkillExecutionResult>> {
        let outcomes = self.execute_plan(mission, plan).await?;
        Ok(outcomes.into_iter().map(|outcome| outcome.result).collect())
    }

    /// Execute mutually independent steps concurrently. Results come back in
    /// input order. Bypasses the geometry gate and the ledger; not used by
    /// [`Orchestrator::orchestrate`].
    pub async fn execute_parallel(&self, steps: &[ExecutionStep]) -> Vec<SkillExecutionResult> {
        let calls = steps.iter().map(|step| async move {
            let started = Instant::now();
            let call = self
                .executor
                .execute_skill(&step.skill_id, &step.parameters, None);
            match tokio::time::timeout(self.step_timeout, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(err)) => SkillExecutionResult::failed(format!("{err:#}"), elapsed_ms(started)),
                Err(_) => SkillExecutionResult::failed(
                    timeout_message(self.step_timeout),
                    elapsed_ms(started),
                ),
            }
        });
        join_all(calls).await
    }

    async fn run_agent(&self, dna: &AgentDna, mission: &Mission) -> Result<Vec<StepOutcome>> {
        let plan = self.plan(dna, mission);
        if plan.is_empty() {
            bail!("empty plan: the skills manifest lists no skills");
        }
        let errors = check_plan(&plan);
        if !errors.is_empty() {
            return Err(PlanError::InvalidPlan(errors).into());
        }
        for warning in validate_topology(&plan, &self.catalog) {
            warn!(%warning, "advisory topology check");
        }
        self.execute_plan(mission, &plan).await
    }

    #[instrument(skip_all, fields(mission_id = %mission.id, steps = plan.len()))]
    async fn execute_plan(
        &self,
        mission: &Mission,
        plan: &[ExecutionStep],
    ) -> Result<Vec<StepOutcome>> {
        let ordered = topological_sort(plan)?;
        let mut working = simplex(&[StateVertex::Init]);
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(ordered.len());

        for (index, step) in ordered.iter().enumerate() {
            let previous = outcomes
                .last()
                .and_then(|outcome| outcome.result.data.clone());
            let result = self
                .run_step(mission, step, &mut working, previous.as_ref())
                .await;
            self.record(mission, step, index, previous, &result);
            outcomes.push(StepOutcome {
                step_id: step.id,
                skill_id: step.skill_id.clone(),
                result,
            });
        }
        Ok(outcomes)
    }

    async fn run_step(
        &self,
        mission: &Mission,
        step: &ExecutionStep,
        working: &mut Simplex,
        previous: Option<&Value>,
    ) -> SkillExecutionResult {
        let started = Instant::now();

        if let Some(vertex) = self.catalog.vertex_for(&step.skill_id) {
            let weights = self.weights.sample();
            let transition = self
                .validator
                .validate_and_weigh_transition(working, vertex, &weights);
            if !transition.is_valid {
                let error = format!(
                    "Topological violation: cannot transition to {vertex} from {}",
                    render_simplex(working)
                );
                warn!(step = step.id, skill_id = %step.skill_id, %error, "step blocked");
                return SkillExecutionResult::failed(error, elapsed_ms(started));
            }
            debug!(
                step = step.id,
                %vertex,
                weight = transition.topological_weight,
                "transition accepted"
            );
            working.insert(vertex);
        }

        let budget = match step_budget(self.step_timeout, mission.deadline, Utc::now()) {
            Ok(budget) => budget,
            Err(err) => return SkillExecutionResult::failed(err.to_string(), elapsed_ms(started)),
        };

        let call = self
            .executor
            .execute_skill(&step.skill_id, &step.parameters, previous);
        match tokio::time::timeout(budget, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(step = step.id, skill_id = %step.skill_id, error = %format!("{err:#}"), "skill failed");
                SkillExecutionResult::failed(format!("{err:#}"), elapsed_ms(started))
            }
            Err(_) => {
                warn!(
                    step = step.id,
                    skill_id = %step.skill_id,
                    budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                    "skill timed out"
                );
                SkillExecutionResult::failed(timeout_message(budget), elapsed_ms(started))
            }
        }
    }

    fn record(
        &self,
        mission: &Mission,
        step: &ExecutionStep,
        index: usize,
        input: Option<Value>,
        result: &SkillExecutionResult,
    ) {
        let bits_erased = if result.success {
            0
        } else {
            bits_for_failed_input(input.as_ref())
        };
        let entry = ComputeState::new(
            format!("{}#{}", mission.id, step.id),
            index,
            step.skill_id.clone(),
            step.parameters.clone(),
            input,
            result.clone(),
            bits_erased,
        );
        lock_ledger(&self.ledger).add_step(entry);
    }
}

/// Lock the ledger, recovering the data if a previous holder panicked.
pub fn lock_ledger(ledger: &SharedLedger) -> MutexGuard<'_, ExecutionLedger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusRule {
    /// Any failed step fails the mission.
    AllOrNothing,
    /// Some successes make a partial result.
    Graded,
}

fn conclude(
    mission: &Mission,
    outcomes: &[StepOutcome],
    started: Instant,
    rule: StatusRule,
) -> MissionResult {
    let step_results: Vec<SkillExecutionResult> =
        outcomes.iter().map(|outcome| outcome.result.clone()).collect();
    let failed_skills: Vec<String> = outcomes
        .iter()
        .filter(|outcome| !outcome.result.success)
        .map(|outcome| outcome.skill_id.clone())
        .collect();
    let succeeded = outcomes.len() - failed_skills.len();

    let status = match rule {
        StatusRule::AllOrNothing if failed_skills.is_empty() => MissionStatus::Success,
        StatusRule::AllOrNothing => MissionStatus::Failed,
        StatusRule::Graded if outcomes.is_empty() || succeeded == 0 => MissionStatus::Failed,
        StatusRule::Graded if failed_skills.is_empty() => MissionStatus::Success,
        StatusRule::Graded => MissionStatus::Partial,
    };

    let reason = if failed_skills.is_empty() {
        outcomes
            .is_empty()
            .then(|| "no steps were executed".to_string())
    } else {
        Some(format!("Failed skills: {}", failed_skills.join(", ")))
    };

    let final_output = match status {
        MissionStatus::Failed => None,
        MissionStatus::Success | MissionStatus::Partial => synthesize(mission, &step_results),
    };

    MissionResult {
        status,
        final_output,
        reason,
        failed_skills,
        step_results,
        total_execution_time_ms: elapsed_ms(started),
    }
}

/// Combine successful step data: the lone result's data, or a rollup.
pub fn synthesize(mission: &Mission, results: &[SkillExecutionResult]) -> Option<Value> {
    let successful: Vec<&SkillExecutionResult> =
        results.iter().filter(|result| result.success).collect();
    match successful.as_slice() {
        [] => None,
        [only] => Some(only.data.clone().unwrap_or(Value::Null)),
        many => {
            let total_ms: u64 = many
                .iter()
                .map(|result| result.metadata.execution_time_ms)
                .sum();
            let data: Vec<Value> = many
                .iter()
                .map(|result| result.data.clone().unwrap_or(Value::Null))
                .collect();
            Some(json!({
                "mission_objective": mission.objective,
                "total_skills_executed": results.len(),
                "successful_skills": many.len(),
                "results": data,
                "summary": format!(
                    "Completed mission \"{}\" using {} skills in {}ms.",
                    mission.objective,
                    many.len(),
                    total_ms
                ),
            }))
        }
    }
}

fn is_coordinator(role: &str) -> bool {
    COORDINATOR_ROLES.iter().any(|marker| role.contains(marker))
}

/// Mission copy whose context carries the upstream result data.
fn with_upstream(mission: &Mission, upstream: Option<&Value>) -> Mission {
    let mut next = mission.clone();
    match upstream {
        Some(Value::Object(fields)) => merge_into(&mut next.context, fields),
        Some(Value::Null) | None => {}
        Some(other) => {
            next.context
                .insert("upstream_data".to_string(), other.clone());
        }
    }
    next
}

fn merge_into(context: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        context.insert(key.clone(), value.clone());
    }
}

fn timeout_message(budget: Duration) -> String {
    format!("skill timed out after {}ms", budget.as_millis())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Check plan invariants and sort, without executing anything.
pub fn ordered_plan(plan: &[ExecutionStep]) -> Result<Vec<ExecutionStep>> {
    let errors = check_plan(plan);
    if !errors.is_empty() {
        return Err(anyhow!(PlanError::InvalidPlan(errors)));
    }
    Ok(topological_sort(plan)?)
}
