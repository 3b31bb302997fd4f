//! Dependency ordering of execution steps (Kahn's algorithm).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::core::types::ExecutionStep;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("dependency cycle among steps {steps:?}")]
    DependencyCycle { steps: Vec<u32> },
    #[error("step id {step} is used more than once")]
    DuplicateStep { step: u32 },
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: u32, dependency: u32 },
    #[error("invalid plan: {}", .0.join("; "))]
    InvalidPlan(Vec<String>),
}

/// Order steps so every dependency precedes its dependents. Among steps that
/// are ready at the same time, the lowest id goes first. Step ids must be
/// unique.
pub fn topological_sort(plan: &[ExecutionStep]) -> Result<Vec<ExecutionStep>, PlanError> {
    let mut by_id: BTreeMap<u32, &ExecutionStep> = BTreeMap::new();
    for step in plan {
        if by_id.insert(step.id, step).is_some() {
            return Err(PlanError::DuplicateStep { step: step.id });
        }
    }

    let mut pending: HashMap<u32, usize> = HashMap::new();
    let mut dependents: HashMap<u32, Vec<u32>> = HashMap::new();
    for step in plan {
        let mut unique = BTreeSet::new();
        for dependency in &step.dependencies {
            if !by_id.contains_key(dependency) {
                return Err(PlanError::UnknownDependency {
                    step: step.id,
                    dependency: *dependency,
                });
            }
            if unique.insert(*dependency) {
                dependents.entry(*dependency).or_default().push(step.id);
            }
        }
        pending.insert(step.id, unique.len());
    }

    let mut ready: BTreeSet<u32> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut ordered = Vec::with_capacity(plan.len());

    while let Some(id) = ready.pop_first() {
        if let Some(step) = by_id.get(&id) {
            ordered.push((*step).clone());
        }
        for dependent in dependents.get(&id).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if ordered.len() < by_id.len() {
        let placed: BTreeSet<u32> = ordered.iter().map(|step| step.id).collect();
        let steps = by_id.keys().copied().filter(|id| !placed.contains(id)).collect();
        return Err(PlanError::DependencyCycle { steps });
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn step(id: u32, dependencies: &[u32]) -> ExecutionStep {
        ExecutionStep {
            id,
            skill_id: format!("skill_{id}"),
            parameters: Map::new(),
            dependencies: dependencies.to_vec(),
            condition: None,
        }
    }

    fn order(plan: &[ExecutionStep]) -> Vec<u32> {
        topological_sort(plan)
            .expect("sort")
            .iter()
            .map(|step| step.id)
            .collect()
    }

    #[test]
    fn sequential_plan_keeps_order() {
        let plan = vec![step(1, &[]), step(2, &[1]), step(3, &[2])];
        assert_eq!(order(&plan), vec![1, 2, 3]);
    }

    /// Listed out of order, dependencies still come first.
    #[test]
    fn dependencies_precede_dependents() {
        let plan = vec![step(3, &[1, 2]), step(2, &[1]), step(1, &[])];
        assert_eq!(order(&plan), vec![1, 2, 3]);
    }

    #[test]
    fn ready_ties_break_by_ascending_id() {
        let plan = vec![step(4, &[]), step(2, &[]), step(3, &[2]), step(1, &[4])];
        assert_eq!(order(&plan), vec![2, 3, 4, 1]);
    }

    #[test]
    fn cycle_is_reported_with_its_members() {
        let plan = vec![step(1, &[]), step(2, &[3]), step(3, &[2])];
        let err = topological_sort(&plan).expect_err("cycle");
        assert_eq!(err, PlanError::DependencyCycle { steps: vec![2, 3] });
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let plan = vec![step(1, &[9])];
        let err = topological_sort(&plan).expect_err("unknown");
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                step: 1,
                dependency: 9
            }
        );
        assert_eq!(err.to_string(), "step 1 depends on unknown step 9");
    }

    #[test]
    fn duplicate_step_id_is_rejected() {
        let plan = vec![step(1, &[]), step(1, &[])];
        let err = topological_sort(&plan).expect_err("duplicate");
        assert_eq!(err, PlanError::DuplicateStep { step: 1 });
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let plan = vec![step(1, &[]), step(2, &[1, 1])];
        assert_eq!(order(&plan), vec![1, 2]);
    }

    #[test]
    fn invalid_plan_message_joins_errors() {
        let err = PlanError::InvalidPlan(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "invalid plan: a; b");
    }
}
