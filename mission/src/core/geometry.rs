//! State geometry validation: may the working simplex grow by one vertex?

use serde::{Deserialize, Serialize};

use crate::core::vertex::{Simplex, StateVertex, TopologicalWeights, ValidComplex};

const LATENCY_WEIGHT: f64 = 0.4;
const COST_WEIGHT: f64 = 0.3;
const COMPLIANCE_WEIGHT: f64 = 0.3;
const MIN_COMPLIANCE: f64 = 0.1;

/// Verdict for one candidate transition. Lower weight is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub is_valid: bool,
    pub topological_weight: f64,
}

impl Transition {
    fn blocked() -> Self {
        Self {
            is_valid: false,
            topological_weight: f64::INFINITY,
        }
    }
}

/// Pure validator over a fixed Valid Complex.
#[derive(Debug, Clone)]
pub struct GeometryValidator {
    complex: ValidComplex,
}

impl Default for GeometryValidator {
    fn default() -> Self {
        Self::new(ValidComplex::trading())
    }
}

impl GeometryValidator {
    pub fn new(complex: ValidComplex) -> Self {
        Self { complex }
    }

    pub fn complex(&self) -> &ValidComplex {
        &self.complex
    }

    /// Check directed rules, then inclusion of `current ∪ {candidate}` in the
    /// complex, then score the transition.
    pub fn validate_and_weigh_transition(
        &self,
        current: &Simplex,
        candidate: StateVertex,
        weights: &TopologicalWeights,
    ) -> Transition {
        let violates_rule = self
            .complex
            .directed_rules
            .iter()
            .any(|rule| rule.vertex == candidate && !current.contains(&rule.requires));
        if violates_rule {
            return Transition::blocked();
        }

        let mut next = current.clone();
        next.insert(candidate);
        if !self.complex.contains(&next) {
            return Transition::blocked();
        }

        Transition {
            is_valid: true,
            topological_weight: weigh(weights),
        }
    }
}

/// Weighted score of a valid transition; never negative.
pub fn weigh(weights: &TopologicalWeights) -> f64 {
    let latency = (weights.latency_ms.max(0.0) / 1000.0).min(1.0);
    let cost = weights.cost.clamp(0.0, 1.0);
    let compliance = weights.compliance_score.max(MIN_COMPLIANCE);
    LATENCY_WEIGHT * latency + COST_WEIGHT * cost + COMPLIANCE_WEIGHT * (1.0 / compliance)
}

/// Stable `A_B_C` key for a simplex.
pub fn canonicalize(simplex: &Simplex) -> String {
    let labels: Vec<&str> = simplex.iter().map(|vertex| vertex.label()).collect();
    labels.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex::simplex;
    use StateVertex::{
        ArbitrageExecuted, FundsAvailable, Init, PriceCheckedA, PriceCheckedB, RiskAssessed,
    };

    fn weights(latency_ms: f64, cost: f64, compliance_score: f64) -> TopologicalWeights {
        TopologicalWeights {
            latency_ms,
            cost,
            compliance_score,
        }
    }

    fn nominal() -> TopologicalWeights {
        weights(100.0, 0.1, 0.95)
    }

    /// Execution without risk assessment is blocked regardless of inclusion.
    #[test]
    fn directed_rule_blocks_execution_before_risk() {
        let validator = GeometryValidator::default();
        let current = simplex(&[Init, PriceCheckedA, PriceCheckedB, FundsAvailable]);

        let transition =
            validator.validate_and_weigh_transition(&current, ArbitrageExecuted, &nominal());

        assert!(!transition.is_valid);
        assert!(transition.topological_weight.is_infinite());
    }

    #[test]
    fn execution_after_risk_is_valid() {
        let validator = GeometryValidator::default();
        let current = simplex(&[
            Init,
            PriceCheckedA,
            PriceCheckedB,
            FundsAvailable,
            RiskAssessed,
        ]);

        let transition =
            validator.validate_and_weigh_transition(&current, ArbitrageExecuted, &nominal());

        assert!(transition.is_valid);
        assert!(transition.topological_weight.is_finite());
    }

    /// The `{INIT}` seed plus any direct single-vertex extension present in the
    /// complex is accepted.
    #[test]
    fn init_plus_first_price_check_is_valid() {
        let validator = GeometryValidator::default();
        let transition =
            validator.validate_and_weigh_transition(&simplex(&[Init]), PriceCheckedA, &nominal());
        assert!(transition.is_valid);
    }

    /// Two disjoint branches: combining them leaves every member simplex.
    #[test]
    fn inclusion_failure_is_blocked() {
        let validator = GeometryValidator::new(ValidComplex {
            simplices: vec![
                simplex(&[Init, PriceCheckedA]),
                simplex(&[Init, PriceCheckedB]),
            ],
            directed_rules: Vec::new(),
        });
        let current = simplex(&[Init, PriceCheckedA]);
        let transition = validator.validate_and_weigh_transition(&current, PriceCheckedB, &nominal());
        assert!(!transition.is_valid);
        assert_eq!(transition.topological_weight, f64::INFINITY);
    }

    #[test]
    fn weight_formula_matches_reference_values() {
        let score = weigh(&weights(500.0, 0.2, 1.0));
        assert!((score - (0.4 * 0.5 + 0.3 * 0.2 + 0.3)).abs() < 1e-12);

        let capped = weigh(&weights(5_000.0, 3.0, 1.0));
        assert!((capped - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_compliance_is_clamped() {
        let score = weigh(&weights(0.0, 0.0, 0.0));
        assert!((score - 3.0).abs() < 1e-12);
    }

    #[test]
    fn negative_inputs_never_produce_negative_weight() {
        let score = weigh(&weights(-1_000.0, -5.0, 2.0));
        assert!(score >= 0.0);
        assert!((score - 0.15).abs() < 1e-12);
    }

    /// Same inputs, same verdict.
    #[test]
    fn validator_is_deterministic() {
        let validator = GeometryValidator::default();
        let current = simplex(&[Init, PriceCheckedA]);
        let first = validator.validate_and_weigh_transition(&current, PriceCheckedB, &nominal());
        let second = validator.validate_and_weigh_transition(&current, PriceCheckedB, &nominal());
        assert_eq!(first, second);
    }

    #[test]
    fn canonicalize_joins_labels_in_order() {
        let key = canonicalize(&simplex(&[FundsAvailable, Init]));
        assert_eq!(key, "INIT_FUNDS_AVAILABLE");
    }
}
