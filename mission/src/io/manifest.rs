//! JSON inputs for CLI commands: agent DNA, missions, squads and action windows.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;

use crate::core::anomaly::AgentAction;
use crate::core::types::{AgentDna, Mission, SquadMember};

pub fn load_dna(path: &Path) -> Result<AgentDna> {
    let dna: AgentDna = read_json(path)?;
    if dna.skills_manifest.iter().any(|skill| skill.skill_id.trim().is_empty()) {
        bail!("{}: skills_manifest contains an empty skill_id", path.display());
    }
    Ok(dna)
}

pub fn load_mission(path: &Path) -> Result<Mission> {
    let mission: Mission = read_json(path)?;
    if mission.id.trim().is_empty() {
        bail!("{}: mission id must not be empty", path.display());
    }
    Ok(mission)
}

pub fn load_squad(path: &Path) -> Result<Vec<SquadMember>> {
    let members: Vec<SquadMember> = read_json(path)?;
    if members.is_empty() {
        bail!("{}: squad has no members", path.display());
    }
    Ok(members)
}

pub fn load_actions(path: &Path) -> Result<Vec<AgentAction>> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_dna_with_protocol() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dna.json");
        fs::write(
            &path,
            r#"{"skills_manifest":[{"skill_id":"multi_source_research"}],"reasoning_protocol":"research first"}"#,
        )
        .expect("write");

        let dna = load_dna(&path).expect("load");

        assert_eq!(dna.skills_manifest[0].skill_id, "multi_source_research");
        assert_eq!(dna.reasoning_protocol.as_deref(), Some("research first"));
    }

    #[test]
    fn mission_context_and_deadline_are_optional() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("mission.json");
        fs::write(&path, r#"{"id":"m-7","objective":"scan"}"#).expect("write");

        let mission = load_mission(&path).expect("load");

        assert!(mission.context.is_empty());
        assert!(mission.deadline.is_none());
    }

    #[test]
    fn empty_squad_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("squad.json");
        fs::write(&path, "[]").expect("write");
        let err = load_squad(&path).expect_err("empty");
        assert!(err.to_string().contains("no members"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_actions(&temp.path().join("nope.json")).expect_err("missing");
        assert!(format!("{err:#}").contains("nope.json"));
    }
}
