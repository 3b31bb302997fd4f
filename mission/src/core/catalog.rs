//! Keyword tables classifying skills.
//!
//! A skill id is matched by case-insensitive substring against ordered
//! keyword rules. The first vertex rule that matches wins.

use serde::{Deserialize, Serialize};

use crate::core::vertex::StateVertex;

/// Maps skills containing any of `keywords` to `vertex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRule {
    pub keywords: Vec<String>,
    pub vertex: StateVertex,
}

impl VertexRule {
    fn new(keywords: &[&str], vertex: StateVertex) -> Self {
        Self {
            keywords: keywords.iter().map(|keyword| (*keyword).to_string()).collect(),
            vertex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCatalog {
    pub vertex_rules: Vec<VertexRule>,
    /// Skills that gather information before acting.
    pub research_keywords: Vec<String>,
    /// Skills with an irreversible external effect.
    pub action_keywords: Vec<String>,
    /// Skills the anomaly scorer treats as known-safe territory.
    pub baseline_skills: Vec<String>,
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self {
            vertex_rules: vec![
                VertexRule::new(&["price"], StateVertex::PriceCheckedA),
                VertexRule::new(&["funds"], StateVertex::FundsAvailable),
                VertexRule::new(&["risk", "sentiment"], StateVertex::RiskAssessed),
                VertexRule::new(&["trade", "arbitrage"], StateVertex::ArbitrageExecuted),
            ],
            research_keywords: strings(&["research", "analysis", "sentiment"]),
            action_keywords: strings(&["trade", "arbitrage"]),
            baseline_skills: strings(&[
                "multi_source_research",
                "seo_content_optimizer",
                "skill_composer",
                "social_media_campaign",
                "competitive_analysis",
            ]),
        }
    }
}

impl SkillCatalog {
    /// Candidate vertex for a skill, or `None` when no rule applies.
    pub fn vertex_for(&self, skill_id: &str) -> Option<StateVertex> {
        let skill = skill_id.to_lowercase();
        self.vertex_rules
            .iter()
            .find(|rule| mentions_any(&skill, &rule.keywords))
            .map(|rule| rule.vertex)
    }

    pub fn is_research(&self, skill_id: &str) -> bool {
        mentions_any(&skill_id.to_lowercase(), &self.research_keywords)
    }

    pub fn is_action(&self, skill_id: &str) -> bool {
        mentions_any(&skill_id.to_lowercase(), &self.action_keywords)
    }

    pub fn is_baseline(&self, skill_id: &str) -> bool {
        self.baseline_skills.iter().any(|skill| skill == skill_id)
    }

    /// Validate the tables. Returns one message per problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (index, rule) in self.vertex_rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                errors.push(format!("catalog.vertex_rules[{index}]: keywords must not be empty"));
            }
            if rule.keywords.iter().any(|keyword| keyword.trim().is_empty()) {
                errors.push(format!("catalog.vertex_rules[{index}]: blank keyword"));
            }
        }
        if self.action_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            errors.push("catalog.action_keywords: blank keyword".to_string());
        }
        if self.research_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            errors.push("catalog.research_keywords: blank keyword".to_string());
        }
        errors
    }
}

fn mentions_any(skill: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| skill.contains(&keyword.to_lowercase()))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
