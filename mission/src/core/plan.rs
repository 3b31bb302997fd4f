//! Plan parsing from a reasoning protocol and a skills manifest.

use crate::core::types::{ExecutionStep, Mission, SkillRef};

/// Turn a protocol into sequential steps.
///
/// A blank protocol selects every manifest skill. Otherwise a skill is
/// selected when its id, or the id with underscores read as spaces, appears
/// case-insensitively in any protocol line. Selection keeps manifest order;
/// a protocol that mentions nothing falls back to the full manifest.
pub fn parse_protocol(
    protocol: &str,
    manifest: &[SkillRef],
    mission: &Mission,
) -> Vec<ExecutionStep> {
    if protocol.trim().is_empty() {
        return sequential_steps(manifest.iter(), mission);
    }

    let lines: Vec<String> = protocol.lines().map(str::to_lowercase).collect();
    let mentioned: Vec<&SkillRef> = manifest
        .iter()
        .filter(|skill| is_mentioned(&lines, &skill.skill_id))
        .collect();

    if mentioned.is_empty() {
        sequential_steps(manifest.iter(), mission)
    } else {
        sequential_steps(mentioned.into_iter(), mission)
    }
}

fn is_mentioned(lines: &[String], skill_id: &str) -> bool {
    let id = skill_id.to_lowercase();
    let spaced = id.replace('_', " ");
    lines
        .iter()
        .any(|line| line.contains(&id) || line.contains(&spaced))
}

fn sequential_steps<'a>(
    skills: impl Iterator<Item = &'a SkillRef>,
    mission: &Mission,
) -> Vec<ExecutionStep> {
    skills
        .zip(1u32..)
        .map(|(skill, id)| ExecutionStep {
            id,
            skill_id: skill.skill_id.clone(),
            parameters: mission.context.clone(),
            dependencies: if id > 1 { vec![id - 1] } else { Vec::new() },
            condition: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentDna;
    use serde_json::json;

    fn manifest() -> Vec<SkillRef> {
        AgentDna::from_skills(["multi_source_research", "market_sentiment_trader", "flash_arbitrage"])
            .skills_manifest
    }

    fn mission() -> Mission {
        let mut mission = Mission::new("m-1", "find an edge");
        mission.context.insert("pair".to_string(), json!("ETH/USDC"));
        mission
    }

    fn ids(plan: &[ExecutionStep]) -> Vec<&str> {
        plan.iter().map(|step| step.skill_id.as_str()).collect()
    }

    #[test]
    fn blank_protocol_selects_every_skill_sequentially() {
        let plan = parse_protocol("  \n ", &manifest(), &mission());

        assert_eq!(
            ids(&plan),
            vec!["multi_source_research", "market_sentiment_trader", "flash_arbitrage"]
        );
        assert_eq!(plan[0].id, 1);
        assert!(plan[0].dependencies.is_empty());
        assert_eq!(plan[1].dependencies, vec![1]);
        assert_eq!(plan[2].dependencies, vec![2]);
        assert_eq!(plan[2].parameters.get("pair"), Some(&json!("ETH/USDC")));
    }

    /// Mentions may use the spaced form and any case; manifest order wins.
    #[test]
    fn protocol_selects_mentioned_skills_in_manifest_order() {
        let protocol = "1. Run FLASH ARBITRAGE when spread is wide\n0. start with multi_source_research";

        let plan = parse_protocol(protocol, &manifest(), &mission());

        assert_eq!(ids(&plan), vec!["multi_source_research", "flash_arbitrage"]);
        assert_eq!(plan[1].id, 2);
        assert_eq!(plan[1].dependencies, vec![1]);
    }

    #[test]
    fn protocol_without_mentions_falls_back_to_all() {
        let plan = parse_protocol("think carefully", &manifest(), &mission());
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn empty_manifest_yields_empty_plan() {
        assert!(parse_protocol("", &[], &mission()).is_empty());
    }
}
