//! State vertices and the Valid Complex table.
//!
//! The complex is plain data: an ordered list of allowed vertex sets plus a
//! list of directed precedence rules. Swapping mission domains means building
//! a different table, not subclassing anything.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One atomic completed sub-goal of a trading mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateVertex {
    Init,
    PriceCheckedA,
    PriceCheckedB,
    FundsAvailable,
    RiskAssessed,
    ArbitrageExecuted,
}

impl StateVertex {
    pub fn label(self) -> &'static str {
        match self {
            StateVertex::Init => "INIT",
            StateVertex::PriceCheckedA => "PRICE_CHECKED_A",
            StateVertex::PriceCheckedB => "PRICE_CHECKED_B",
            StateVertex::FundsAvailable => "FUNDS_AVAILABLE",
            StateVertex::RiskAssessed => "RISK_ASSESSED",
            StateVertex::ArbitrageExecuted => "ARBITRAGE_EXECUTED",
        }
    }
}

impl fmt::Display for StateVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of vertices that may coexist as "already completed".
pub type Simplex = BTreeSet<StateVertex>;

/// Build a simplex from a slice of vertices.
pub fn simplex(vertices: &[StateVertex]) -> Simplex {
    vertices.iter().copied().collect()
}

/// Render a simplex as `[A, B, C]` in canonical order.
pub fn render_simplex(simplex: &Simplex) -> String {
    let labels: Vec<&str> = simplex.iter().map(|vertex| vertex.label()).collect();
    format!("[{}]", labels.join(", "))
}

/// `vertex` may only be entered once `requires` is already in the working simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedRule {
    pub vertex: StateVertex,
    pub requires: StateVertex,
}

/// Every reachable, safe combination of completed sub-goals for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidComplex {
    pub simplices: Vec<Simplex>,
    pub directed_rules: Vec<DirectedRule>,
}

impl ValidComplex {
    /// Reference trading complex: nested simplices from `{INIT}` to the full
    /// success simplex, with execution gated on risk assessment.
    pub fn trading() -> Self {
        use StateVertex::{
            ArbitrageExecuted, FundsAvailable, Init, PriceCheckedA, PriceCheckedB, RiskAssessed,
        };

        Self {
            simplices: vec![
                simplex(&[Init]),
                simplex(&[Init, PriceCheckedA]),
                simplex(&[Init, PriceCheckedB]),
                simplex(&[Init, PriceCheckedA, PriceCheckedB]),
                simplex(&[Init, PriceCheckedA, PriceCheckedB, FundsAvailable]),
                simplex(&[
                    Init,
                    PriceCheckedA,
                    PriceCheckedB,
                    FundsAvailable,
                    RiskAssessed,
                ]),
                simplex(&[
                    Init,
                    PriceCheckedA,
                    PriceCheckedB,
                    FundsAvailable,
                    RiskAssessed,
                    ArbitrageExecuted,
                ]),
            ],
            directed_rules: vec![DirectedRule {
                vertex: ArbitrageExecuted,
                requires: RiskAssessed,
            }],
        }
    }

    /// True if `state` is a subset of at least one member simplex.
    pub fn contains(&self, state: &Simplex) -> bool {
        self.simplices
            .iter()
            .any(|member| state.is_subset(member))
    }
}

/// Dynamic inputs scoring one candidate transition. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologicalWeights {
    pub latency_ms: f64,
    pub cost: f64,
    /// 0.0 - 1.0, higher is better.
    pub compliance_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use StateVertex::{ArbitrageExecuted, FundsAvailable, Init, PriceCheckedA, RiskAssessed};

    #[test]
    fn render_simplex_uses_canonical_order() {
        let state = simplex(&[RiskAssessed, Init, PriceCheckedA]);
        assert_eq!(
            render_simplex(&state),
            "[INIT, PRICE_CHECKED_A, RISK_ASSESSED]"
        );
    }

    /// Each member that properly contains another grows from it monotonically.
    #[test]
    fn trading_complex_is_a_monotone_chain_from_init() {
        let complex = ValidComplex::trading();
        assert_eq!(complex.simplices.first(), Some(&simplex(&[Init])));
        for member in &complex.simplices {
            assert!(member.contains(&Init));
        }
        let full = complex.simplices.last().expect("full simplex");
        assert!(full.contains(&ArbitrageExecuted));
        assert!(complex.contains(&simplex(&[Init, PriceCheckedA, FundsAvailable])));
    }

    #[test]
    fn vertices_serialize_screaming_snake() {
        let json = serde_json::to_string(&ArbitrageExecuted).expect("json");
        assert_eq!(json, "\"ARBITRAGE_EXECUTED\"");
    }
}
