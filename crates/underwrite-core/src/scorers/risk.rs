//! Risk assessment scoring.
//!
//! Checks that the credit analyst's tier agrees with the credit score, that
//! risk factors were identified (and name the obvious ones), and that a risk
//! score and the applicant's employment status were reported.

use crate::envelope::{Envelope, CREDIT_ANALYST, LOAN_OFFICER};
use crate::evidence::Evidence;
use crate::types::{CheckResult, Component, ComponentFinding};

use super::policy::{CreditTier, DTI_CEILING, POOR_CREDIT_CUTOFF, RISK_SCORE_RANGE};
use super::{any_mentions, Scorer, Tally};

const TIER_POINTS: f64 = 0.3;
const FACTORS_POINTS: f64 = 0.2;
const FACTOR_BONUS_POINTS: f64 = 0.1;
const RISK_SCORE_POINTS: f64 = 0.2;
const EMPLOYMENT_POINTS: f64 = 0.1;

/// Scores the credit analyst's risk evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessmentScorer;

impl RiskAssessmentScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for RiskAssessmentScorer {
    fn component(&self) -> Component {
        Component::RiskAssessment
    }

    fn score(&self, envelope: &Envelope) -> ComponentFinding {
        let mut tally = Tally::new(self.component());
        let ca = envelope.credit_analyst();
        let lo = envelope.loan_officer();
        let credit_score = ca.credit_score.map(f64::trunc);

        // RISK1: tier matches score
        let description = "Credit tier matches credit score";
        match (credit_score, ca.credit_tier.as_deref()) {
            (Some(score), Some(label)) => {
                let implied = CreditTier::from_score(score);
                if implied.matches_label(label) {
                    tally.record(
                        CheckResult::earned("RISK1", description, TIER_POINTS)
                            .because(format!("Score {} is {}", score, implied.name()))
                            .with_evidence(Evidence::from_agent(
                                format!("Tier reported as {}", label),
                                CREDIT_ANALYST,
                                "credit_tier",
                            )),
                    );
                } else {
                    tally.record(CheckResult::not_earned("RISK1", description).because(format!(
                        "Score {} implies {}, reported {}",
                        score,
                        implied.name(),
                        label
                    )));
                }
            }
            _ => tally.record(
                CheckResult::not_earned("RISK1", description)
                    .because("credit_score or credit_tier missing"),
            ),
        }

        // RISK2-4: risk factors, with bonuses for naming the obvious ones
        let factors = ca.risk_factors.as_deref().unwrap_or_default();
        if factors.is_empty() {
            tally.record(
                CheckResult::not_earned("RISK2", "Risk factors identified")
                    .because("risk_factors missing or empty"),
            );
        } else {
            tally.record(
                CheckResult::earned("RISK2", "Risk factors identified", FACTORS_POINTS)
                    .because(format!("{} factor(s) listed", factors.len())),
            );

            let description = "High DTI named as a risk factor";
            let high_dti = ca.dti_ratio.is_some_and(|dti| dti > DTI_CEILING);
            if high_dti && any_mentions(factors, "dti") {
                tally.record(CheckResult::earned("RISK3", description, FACTOR_BONUS_POINTS));
            } else if high_dti {
                tally.record(CheckResult::not_earned("RISK3", description));
            }

            let description = "Poor credit named as a risk factor";
            let poor_credit = credit_score.is_some_and(|s| s < POOR_CREDIT_CUTOFF);
            if poor_credit && any_mentions(factors, "credit") {
                tally.record(CheckResult::earned("RISK4", description, FACTOR_BONUS_POINTS));
            } else if poor_credit {
                tally.record(CheckResult::not_earned("RISK4", description));
            }
        }

        // RISK5: risk score on the 1-10 scale
        let description = "Risk score reported on a 1-10 scale";
        match ca.risk_score {
            Some(risk_score) if RISK_SCORE_RANGE.contains(&risk_score) => tally.record(
                CheckResult::earned("RISK5", description, RISK_SCORE_POINTS).with_evidence(
                    Evidence::from_agent(
                        format!("Risk score {}", risk_score),
                        CREDIT_ANALYST,
                        "risk_score",
                    ),
                ),
            ),
            Some(risk_score) => tally.record(
                CheckResult::not_earned("RISK5", description)
                    .because(format!("Risk score {} out of range", risk_score)),
            ),
            None => tally.record(
                CheckResult::not_earned("RISK5", description).because("risk_score missing"),
            ),
        }

        // RISK6: employment verified
        let description = "Employment status reported";
        let employment = lo
            .employment_status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"));
        match employment {
            Some(status) => tally.record(
                CheckResult::earned("RISK6", description, EMPLOYMENT_POINTS).with_evidence(
                    Evidence::from_agent(
                        format!("Employment status {}", status),
                        LOAN_OFFICER,
                        "employment_status",
                    ),
                ),
            ),
            None => tally.record(
                CheckResult::not_earned("RISK6", description)
                    .because("employment_status missing, blank or unknown"),
            ),
        }

        tally.finish()
    }
}
