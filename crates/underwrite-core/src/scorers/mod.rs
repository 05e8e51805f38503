//! The five component scorers.
//!
//! Each scorer reads the envelope, runs a fixed list of checks and returns a
//! [`ComponentFinding`] whose score is the sum of earned increments, capped
//! at 1.0. Scorers never fail: a missing or wrong-typed field withholds the
//! increment that needed it and nothing else.
//!
//! | Scorer | Weight | Checks |
//! |--------|--------|--------|
//! | [`StructureValidator`] | 0.20 | required fields and agents present |
//! | [`CalculationVerifier`] | 0.25 | recomputed payment and DTI match reports |
//! | [`RiskAssessmentScorer`] | 0.20 | credit tier, risk factors, risk score |
//! | [`DecisionLogicScorer`] | 0.20 | decision follows DTI, credit and risk policy |
//! | [`ConsistencyScorer`] | 0.15 | agents agree on figures and recommendation |

mod calculations;
mod consistency;
mod decision;
pub mod policy;
mod risk;
mod structure;

pub use calculations::{amortized_payment, expected_dti, CalculationVerifier};
pub use consistency::ConsistencyScorer;
pub use decision::DecisionLogicScorer;
pub use risk::RiskAssessmentScorer;
pub use structure::StructureValidator;

use crate::envelope::Envelope;
use crate::types::{CheckResult, Component, ComponentFinding};

/// Trait implemented by every component scorer.
///
/// Scorers hold no state and may run in any order, or concurrently.
pub trait Scorer: Send + Sync {
    /// The component this scorer produces.
    fn component(&self) -> Component;

    /// Score the envelope.
    fn score(&self, envelope: &Envelope) -> ComponentFinding;
}

/// Accumulates check results for one component.
pub(crate) struct Tally {
    component: Component,
    points: f64,
    checks: Vec<CheckResult>,
}

impl Tally {
    pub(crate) fn new(component: Component) -> Self {
        Self {
            component,
            points: 0.0,
            checks: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, check: CheckResult) {
        self.points += check.outcome.points();
        self.checks.push(check);
    }

    pub(crate) fn finish(self) -> ComponentFinding {
        ComponentFinding {
            component: self.component,
            score: self.points.clamp(0.0, 1.0),
            checks: self.checks,
        }
    }
}

/// Case-insensitive substring match over a list of free-text entries.
pub(crate) fn any_mentions(entries: &[String], needle: &str) -> bool {
    entries
        .iter()
        .any(|entry| entry.to_lowercase().contains(needle))
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::Value;

    use crate::envelope::Envelope;

    /// Build an envelope from a JSON literal.
    pub fn envelope(value: Value) -> Envelope {
        match value {
            Value::Object(map) => Envelope::from_map(map),
            _ => panic!("test envelope must be an object"),
        }
    }
}
