//! Decision logic scoring.
//!
//! Judges the risk manager's decision against the final decision and the
//! underlying risk signals: DTI, credit score and the analyst's risk tier.

use crate::envelope::{Decision, Envelope, RISK_MANAGER};
use crate::evidence::Evidence;
use crate::types::{CheckResult, Component, ComponentFinding};

use super::policy::{
    RiskTier, DTI_CEILING, HIGH_RISK_RATE_FLOOR, PRIME_CREDIT_CUTOFF, SUBPRIME_CREDIT_CUTOFF,
};
use super::{Scorer, Tally};

const AGREEMENT_POINTS: f64 = 0.3;
const HIGH_DTI_DENIAL_POINTS: f64 = 0.3;
const HIGH_DTI_PRICED_POINTS: f64 = 0.2;
const REASONABLE_DTI_POINTS: f64 = 0.1;
const CREDIT_ALIGNED_POINTS: f64 = 0.2;
const CREDIT_AMBIGUOUS_POINTS: f64 = 0.1;
const RISK_ALIGNED_POINTS: f64 = 0.2;

/// Scores whether the decision follows from the risk signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionLogicScorer;

impl DecisionLogicScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for DecisionLogicScorer {
    fn component(&self) -> Component {
        Component::DecisionLogic
    }

    fn score(&self, envelope: &Envelope) -> ComponentFinding {
        let mut tally = Tally::new(self.component());
        let ca = envelope.credit_analyst();
        let rm = envelope.risk_manager();
        let decision = rm.decision.as_ref();

        // DEC1: risk manager and final decision agree
        let description = "Risk manager decision matches the final decision";
        match (decision, envelope.decision()) {
            (Some(rm_decision), Some(final_decision)) if *rm_decision == final_decision => tally
                .record(
                    CheckResult::earned("DEC1", description, AGREEMENT_POINTS).with_evidence(
                        Evidence::from_agent(
                            format!("Risk manager decided {:?}", rm_decision),
                            RISK_MANAGER,
                            "decision",
                        ),
                    ),
                ),
            (Some(rm_decision), Some(final_decision)) => tally.record(
                CheckResult::not_earned("DEC1", description).because(format!(
                    "Risk manager {:?}, final {:?}",
                    rm_decision, final_decision
                )),
            ),
            _ => tally.record(
                CheckResult::not_earned("DEC1", description).because("A decision is missing"),
            ),
        }

        // DEC2: DTI policy
        let description = "Decision follows DTI policy";
        match ca.dti_ratio.filter(|dti| *dti > 0.0) {
            Some(dti) if dti > DTI_CEILING => {
                let check = match decision {
                    Some(Decision::Denied) => {
                        CheckResult::earned("DEC2", description, HIGH_DTI_DENIAL_POINTS)
                            .because(format!("DTI {:.2} above ceiling, denied", dti))
                    }
                    Some(Decision::Approved)
                        if rm.interest_rate.is_some_and(|r| r > HIGH_RISK_RATE_FLOOR) =>
                    {
                        CheckResult::earned("DEC2", description, HIGH_DTI_PRICED_POINTS)
                            .because(format!("DTI {:.2} above ceiling, priced for risk", dti))
                    }
                    _ => CheckResult::not_earned("DEC2", description)
                        .because(format!("DTI {:.2} above ceiling without denial or pricing", dti)),
                };
                tally.record(check);
            }
            Some(dti) => tally.record(
                CheckResult::earned("DEC2", description, REASONABLE_DTI_POINTS)
                    .because(format!("DTI {:.2} within ceiling", dti)),
            ),
            None => tally.record(
                CheckResult::skipped("DEC2", description).because("dti_ratio missing"),
            ),
        }

        // DEC3: credit policy
        let description = "Decision follows credit score policy";
        match ca.credit_score {
            Some(score) if score < SUBPRIME_CREDIT_CUTOFF => {
                if decision.is_some_and(Decision::is_denied) {
                    tally.record(
                        CheckResult::earned("DEC3", description, CREDIT_ALIGNED_POINTS)
                            .because(format!("Subprime score {} denied", score)),
                    );
                } else {
                    tally.record(
                        CheckResult::not_earned("DEC3", description)
                            .because(format!("Subprime score {} not denied", score)),
                    );
                }
            }
            Some(score) if score >= PRIME_CREDIT_CUTOFF => {
                if decision.is_some_and(Decision::is_approved) {
                    tally.record(
                        CheckResult::earned("DEC3", description, CREDIT_ALIGNED_POINTS)
                            .because(format!("Prime score {} approved", score)),
                    );
                } else {
                    tally.record(
                        CheckResult::not_earned("DEC3", description)
                            .because(format!("Prime score {} not approved", score)),
                    );
                }
            }
            Some(score) => tally.record(
                CheckResult::earned("DEC3", description, CREDIT_AMBIGUOUS_POINTS)
                    .because(format!("Score {} in the ambiguous zone", score)),
            ),
            None => tally.record(
                CheckResult::skipped("DEC3", description).because("credit_score missing"),
            ),
        }

        // DEC4: risk tier policy
        let description = "Decision follows the assessed risk tier";
        let tier = ca.risk_assessment.as_deref().and_then(RiskTier::parse);
        let aligned = match (tier, decision) {
            (Some(RiskTier::High), Some(Decision::Denied)) => true,
            (Some(RiskTier::Low), Some(Decision::Approved)) => true,
            _ => false,
        };
        if aligned {
            tally.record(CheckResult::earned("DEC4", description, RISK_ALIGNED_POINTS));
        } else {
            tally.record(CheckResult::not_earned("DEC4", description));
        }

        tally.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::test_support::envelope;
    use serde_json::json;

    fn sample(
        dti: f64,
        credit: f64,
        risk: &str,
        rm_decision: &str,
        rate: f64,
        final_decision: &str,
    ) -> Envelope {
        envelope(json!({
            "decision": final_decision,
            "agent_outputs": {
                "credit_analyst": {
                    "dti_ratio": dti,
                    "credit_score": credit,
                    "risk_assessment": risk
                },
                "risk_manager": {"decision": rm_decision, "interest_rate": rate}
            }
        }))
    }

    #[test]
    fn test_clean_approval() {
        let env = sample(0.26, 780.0, "low", "APPROVED", 6.5, "approved");
        let finding = DecisionLogicScorer::new().score(&env);

        assert_eq!(finding.points_for("DEC1"), 0.3);
        assert_eq!(finding.points_for("DEC2"), 0.1);
        assert_eq!(finding.points_for("DEC3"), 0.2);
        assert_eq!(finding.points_for("DEC4"), 0.2);
        assert!((finding.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_clean_denial_caps_at_one() {
        let env = sample(0.55, 590.0, "high", "DENIED", 15.0, "DENIED");
        let finding = DecisionLogicScorer::new().score(&env);

        assert_eq!(finding.points_for("DEC2"), 0.3);
        assert_eq!(finding.score, 1.0);
    }

    #[test]
    fn test_high_dti_approval_needs_risk_pricing() {
        let priced = sample(0.5, 680.0, "medium", "APPROVED", 13.0, "APPROVED");
        assert_eq!(DecisionLogicScorer::new().score(&priced).points_for("DEC2"), 0.2);

        let unpriced = sample(0.5, 680.0, "medium", "APPROVED", 9.0, "APPROVED");
        assert_eq!(DecisionLogicScorer::new().score(&unpriced).points_for("DEC2"), 0.0);
    }

    #[test]
    fn test_ambiguous_credit_zone() {
        for credit in [620.0, 719.0] {
            let env = sample(0.3, credit, "medium", "DENIED", 9.0, "DENIED");
            assert_eq!(DecisionLogicScorer::new().score(&env).points_for("DEC3"), 0.1);
        }
    }

    #[test]
    fn test_disagreement_forfeits_agreement_points() {
        let env = sample(0.26, 780.0, "low", "APPROVED", 6.5, "DENIED");
        let finding = DecisionLogicScorer::new().score(&env);

        assert_eq!(finding.points_for("DEC1"), 0.0);
        assert_eq!(finding.points_for("DEC4"), 0.2);
    }

    #[test]
    fn test_missing_signals_withhold_their_increments() {
        let env = envelope(json!({
            "decision": "APPROVED",
            "agent_outputs": {"risk_manager": {"decision": "APPROVED"}}
        }));

        let finding = DecisionLogicScorer::new().score(&env);
        assert!((finding.score - 0.3).abs() < 1e-9);
    }
}
