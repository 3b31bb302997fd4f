//! Mission configuration merging.
//!
//! Applies case-specific overrides to the default mission configuration.

use std::time::Duration;

use anyhow::Result;
use mission::io::config::{MissionConfig, WeightPolicy};

use crate::case::CaseConfig;

/// Merged settings for one case run.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub mission: MissionConfig,
    pub step_timeout: Duration,
}

/// Apply case configuration overrides to the base mission config.
pub fn apply_case_config(mut base: MissionConfig, overrides: &CaseConfig) -> Result<EffectiveConfig> {
    if let Some([latency_ms, cost, compliance_score]) = overrides.fixed_weights {
        base.weights = WeightPolicy::fixed(latency_ms, cost, compliance_score);
    }
    base.validate()?;
    let step_timeout = overrides
        .step_timeout_ms
        .map_or_else(|| base.step_timeout(), Duration::from_millis);
    Ok(EffectiveConfig {
        mission: base,
        step_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission::io::config::WeightMode;

    #[test]
    fn preserves_defaults_when_no_override() {
        let base = MissionConfig::default();
        let merged = apply_case_config(base.clone(), &CaseConfig::default()).expect("merge");
        assert_eq!(merged.mission, base);
        assert_eq!(merged.step_timeout, Duration::from_secs(300));
    }

    #[test]
    fn applies_timeout_and_weights() {
        let overrides = CaseConfig {
            step_timeout_ms: Some(250),
            fixed_weights: Some([10.0, 0.2, 0.9]),
        };
        let merged = apply_case_config(MissionConfig::default(), &overrides).expect("merge");
        assert_eq!(merged.step_timeout, Duration::from_millis(250));
        assert_eq!(merged.mission.weights.mode, WeightMode::Fixed);
        assert_eq!(merged.mission.weights.cost, 0.2);
    }

    #[test]
    fn rejects_out_of_range_compliance() {
        let overrides = CaseConfig {
            step_timeout_ms: None,
            fixed_weights: Some([10.0, 0.2, 4.0]),
        };
        assert!(apply_case_config(MissionConfig::default(), &overrides).is_err());
    }
}
