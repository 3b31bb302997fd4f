//! Plan-level checks run before execution.

use std::collections::HashSet;

use crate::core::catalog::SkillCatalog;
use crate::core::types::ExecutionStep;

/// Structural invariants a plan must satisfy before it can be scheduled:
/// - No duplicate step ids
/// - No step depends on itself
/// - Skill ids are non-empty
pub fn check_plan(plan: &[ExecutionStep]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for step in plan {
        if !seen.insert(step.id) {
            errors.push(format!("duplicate step id {}", step.id));
        }
        if step.dependencies.contains(&step.id) {
            errors.push(format!("step {} depends on itself", step.id));
        }
        if step.skill_id.trim().is_empty() {
            errors.push(format!("step {}: skill_id must not be empty", step.id));
        }
    }
    errors
}

/// Advisory ordering check. An action-class skill placed first has no
/// research before it; the result is a list of warnings, never a failure.
pub fn validate_topology(plan: &[ExecutionStep], catalog: &SkillCatalog) -> Vec<String> {
    let mut warnings = Vec::new();
    for (index, step) in plan.iter().enumerate() {
        if !catalog.is_action(&step.skill_id) || index != 0 {
            continue;
        }
        let researched = plan[..index]
            .iter()
            .any(|earlier| catalog.is_research(&earlier.skill_id));
        if !researched {
            warnings.push(format!(
                "step {} ({}) takes an irreversible action with no prior research",
                step.id, step.skill_id
            ));
        }
    }
    warnings
}
