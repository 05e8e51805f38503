//! Cross-agent consistency scoring.
//!
//! Rewards agents for agreeing with each other on shared figures and on the
//! recommendation, regardless of whether any single number is correct.

use crate::envelope::{to_f64, Decision, Envelope};
use crate::evidence::Evidence;
use crate::types::{CheckResult, Component, ComponentFinding};

use super::{Scorer, Tally};

const SHARED_FIGURE_POINTS: f64 = 0.3;
const UNANIMOUS_POINTS: f64 = 0.4;
const MIXED_POINTS: f64 = 0.2;

/// Scores agreement across all object-shaped agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyScorer;

impl ConsistencyScorer {
    pub fn new() -> Self {
        Self
    }

    /// CON1/CON2: every agent reporting `field` reports the same number.
    fn shared_figure(&self, envelope: &Envelope, check_id: &str, field: &str) -> CheckResult {
        let description = format!("Agents agree on {}", field);
        let reports: Vec<(&str, Option<f64>)> = envelope
            .agents()
            .filter_map(|agent| agent.raw(field).map(|value| (agent.name(), to_f64(value))))
            .collect();

        if reports.len() < 2 {
            return CheckResult::not_earned(check_id, &description)
                .because(format!("{} agent(s) report {}", reports.len(), field));
        }

        // A reported value that is not a number cannot be confirmed identical
        let Some(values) = reports.iter().map(|(_, v)| *v).collect::<Option<Vec<f64>>>() else {
            return CheckResult::not_earned(check_id, &description)
                .because(format!("Non-numeric {} reported", field));
        };

        let first = values[0];
        if values.iter().all(|v| *v == first) {
            reports.iter().fold(
                CheckResult::earned(check_id, &description, SHARED_FIGURE_POINTS)
                    .because(format!("{} agents report {}", reports.len(), first)),
                |check, (agent, _)| {
                    check.with_evidence(Evidence::from_agent(
                        format!("{} = {}", field, first),
                        agent,
                        field,
                    ))
                },
            )
        } else {
            CheckResult::not_earned(check_id, &description)
                .because(format!("Reported values differ: {:?}", values))
        }
    }
}

impl Scorer for ConsistencyScorer {
    fn component(&self) -> Component {
        Component::Consistency
    }

    fn score(&self, envelope: &Envelope) -> ComponentFinding {
        let mut tally = Tally::new(self.component());

        tally.record(self.shared_figure(envelope, "CON1", "loan_amount"));
        tally.record(self.shared_figure(envelope, "CON2", "monthly_income"));

        // CON3: recommendations against the final decision
        let description = "Recommendations agree with the final decision";
        let recommendations: Vec<Decision> = envelope
            .agents()
            .filter_map(|agent| agent.text("recommendation"))
            .filter_map(Decision::from_recommendation)
            .collect();

        let Some(first) = recommendations.first() else {
            tally.record(
                CheckResult::not_earned("CON3", description).because("No recommendations given"),
            );
            return tally.finish();
        };

        let unanimous = recommendations.iter().all(|r| r == first);
        let final_decision = envelope.decision();
        if unanimous && final_decision.as_ref() == Some(first) {
            tally.record(
                CheckResult::earned("CON3", description, UNANIMOUS_POINTS)
                    .because(format!("All recommendations {:?}", first))
                    .with_evidence(Evidence::from_field(
                        format!("Final decision {:?}", first),
                        "decision",
                    )),
            );
        } else if !unanimous {
            tally.record(
                CheckResult::earned("CON3", description, MIXED_POINTS)
                    .because("Recommendations are mixed"),
            );
        } else {
            tally.record(CheckResult::not_earned("CON3", description).because(format!(
                "Agents recommend {:?}, final decision {:?}",
                first, final_decision
            )));
        }

        tally.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::test_support::envelope;
    use serde_json::json;

    #[test]
    fn test_full_agreement_scores_one() {
        let env = envelope(json!({
            "decision": "APPROVED",
            "agent_outputs": {
                "loan_officer": {
                    "loan_amount": 250000,
                    "monthly_income": 8000,
                    "recommendation": "APPROVED"
                },
                "credit_analyst": {
                    "loan_amount": 250000,
                    "monthly_income": 8000,
                    "recommendation": "APPROVED"
                },
                "risk_manager": {
                    "loan_amount": 250000,
                    "monthly_income": 8000,
                    "recommendation": "APPROVED"
                }
            }
        }));

        let finding = ConsistencyScorer::new().score(&env);
        assert_eq!(finding.points_for("CON1"), 0.3);
        assert_eq!(finding.points_for("CON2"), 0.3);
        assert_eq!(finding.points_for("CON3"), 0.4);
        assert!((finding.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_report_is_not_agreement() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"loan_amount": 250000},
                "credit_analyst": {}
            }
        }));

        assert_eq!(ConsistencyScorer::new().score(&env).points_for("CON1"), 0.0);
    }

    #[test]
    fn test_coerced_figures_compare_equal() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"loan_amount": "250000"},
                "risk_manager": {"loan_amount": 250000.0}
            }
        }));

        assert_eq!(ConsistencyScorer::new().score(&env).points_for("CON1"), 0.3);
    }

    #[test]
    fn test_differing_or_garbled_figures() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"loan_amount": 250000, "monthly_income": 8000},
                "risk_manager": {"loan_amount": 240000, "monthly_income": "eight thousand"}
            }
        }));

        let finding = ConsistencyScorer::new().score(&env);
        assert_eq!(finding.points_for("CON1"), 0.0);
        assert_eq!(finding.points_for("CON2"), 0.0);
    }

    #[test]
    fn test_mixed_recommendations_get_partial_credit() {
        let env = envelope(json!({
            "decision": "APPROVED",
            "agent_outputs": {
                "loan_officer": {"recommendation": "Approve"},
                "credit_analyst": {"recommendation": "Decline due to DTI"}
            }
        }));

        assert_eq!(ConsistencyScorer::new().score(&env).points_for("CON3"), 0.2);
    }

    #[test]
    fn test_unanimous_against_final_decision_earns_nothing() {
        let env = envelope(json!({
            "decision": "DENIED",
            "agent_outputs": {
                "loan_officer": {"recommendation": "APPROVED"},
                "risk_manager": {"recommendation": "approve with conditions"}
            }
        }));

        assert_eq!(ConsistencyScorer::new().score(&env).points_for("CON3"), 0.0);
    }

    #[test]
    fn test_unrecognized_recommendations_are_ignored() {
        let env = envelope(json!({
            "decision": "DENIED",
            "agent_outputs": {
                "loan_officer": {"recommendation": "needs review"},
                "credit_analyst": {"recommendation": "DENIED"}
            }
        }));

        assert_eq!(ConsistencyScorer::new().score(&env).points_for("CON3"), 0.4);
    }
}
