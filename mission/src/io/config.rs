//! Mission configuration (TOML).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::catalog::SkillCatalog;
use crate::core::vertex::TopologicalWeights;

/// Mission configuration.
///
/// Intended to be edited by humans. Missing fields default to the reference
/// trading tables and a five minute step timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MissionConfig {
    /// Wall-clock budget for a single skill invocation, in seconds.
    pub step_timeout_secs: u64,

    pub weights: WeightPolicy,

    pub catalog: SkillCatalog,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 300,
            weights: WeightPolicy::default(),
            catalog: SkillCatalog::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Draw latency and cost uniformly from the configured ranges.
    #[default]
    Sampled,
    /// Use the configured values as-is.
    Fixed,
}

/// Source of [`TopologicalWeights`] for each validated transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeightPolicy {
    pub mode: WeightMode,
    pub latency_ms: f64,
    pub cost: f64,
    pub compliance_score: f64,
    /// Upper bound for sampled latency.
    pub max_latency_ms: f64,
    /// Upper bound for sampled cost.
    pub max_cost: f64,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            mode: WeightMode::Sampled,
            latency_ms: 100.0,
            cost: 0.1,
            compliance_score: 0.95,
            max_latency_ms: 500.0,
            max_cost: 0.5,
        }
    }
}

impl WeightPolicy {
    pub fn fixed(latency_ms: f64, cost: f64, compliance_score: f64) -> Self {
        Self {
            mode: WeightMode::Fixed,
            latency_ms,
            cost,
            compliance_score,
            ..Self::default()
        }
    }

    /// Weights for the next transition.
    pub fn sample(&self) -> TopologicalWeights {
        match self.mode {
            WeightMode::Fixed => TopologicalWeights {
                latency_ms: self.latency_ms,
                cost: self.cost,
                compliance_score: self.compliance_score,
            },
            WeightMode::Sampled => {
                let mut rng = rand::thread_rng();
                TopologicalWeights {
                    latency_ms: sample_up_to(&mut rng, self.max_latency_ms),
                    cost: sample_up_to(&mut rng, self.max_cost),
                    compliance_score: self.compliance_score,
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_latency_ms.is_finite() && self.max_latency_ms >= 0.0) {
            return Err(anyhow!("weights.max_latency_ms must be a finite value >= 0"));
        }
        if !(self.max_cost.is_finite() && self.max_cost >= 0.0) {
            return Err(anyhow!("weights.max_cost must be a finite value >= 0"));
        }
        if !(0.0..=1.0).contains(&self.compliance_score) {
            return Err(anyhow!("weights.compliance_score must be within 0..=1"));
        }
        Ok(())
    }
}

/// Uniform draw from `0..=bound`. A bound that is negative or not finite
/// yields zero.
fn sample_up_to(rng: &mut impl Rng, bound: f64) -> f64 {
    if bound.is_finite() && bound > 0.0 {
        rng.gen_range(0.0..=bound)
    } else {
        0.0
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step_timeout_secs == 0 {
            return Err(anyhow!("step_timeout_secs must be > 0"));
        }
        self.weights.validate()?;
        let catalog_errors = self.catalog.validate();
        if !catalog_errors.is_empty() {
            return Err(anyhow!(catalog_errors.join("; ")));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MissionConfig::default()`.
pub fn load_config(path: &Path) -> Result<MissionConfig> {
    if !path.exists() {
        let cfg = MissionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MissionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &MissionConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf, "toml.tmp")
}

pub(crate) fn write_atomic(path: &Path, contents: &str, tmp_extension: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension(tmp_extension);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
