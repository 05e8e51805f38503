//! Calculation verification.
//!
//! Recomputes the amortized monthly payment and the debt-to-income ratio from
//! the loan officer's primary inputs and the risk manager's terms, then
//! rewards agreement with what the agents reported. Self-reported numbers are
//! never trusted on their own.

use crate::envelope::{Envelope, CREDIT_ANALYST, RISK_MANAGER};
use crate::evidence::Evidence;
use crate::types::{CheckResult, Component, ComponentFinding};

use super::policy::RiskTier;
use super::{Scorer, Tally};

const DTI_CLOSE: f64 = 0.05;
const DTI_NEAR: f64 = 0.10;
const DTI_CLOSE_POINTS: f64 = 0.5;
const DTI_NEAR_POINTS: f64 = 0.3;
const DTI_ATTEMPT_POINTS: f64 = 0.1;

const RATE_TIER_POINTS: f64 = 0.25;
const RATE_PROVIDED_POINTS: f64 = 0.1;

const PAYMENT_TOLERANCE: f64 = 0.05;
const PAYMENT_POINTS: f64 = 0.25;

/// Standard amortized payment: `P·r·(1+r)^n / ((1+r)^n − 1)`.
///
/// `monthly_rate` is a fraction (annual percent / 100 / 12). Returns `None`
/// for non-positive rate or term, or when the result is not finite.
pub fn amortized_payment(principal: f64, monthly_rate: f64, term_months: f64) -> Option<f64> {
    if monthly_rate <= 0.0 || term_months <= 0.0 {
        return None;
    }

    let growth = (1.0 + monthly_rate).powf(term_months);
    let payment = principal * monthly_rate * growth / (growth - 1.0);
    payment.is_finite().then_some(payment)
}

/// Debt-to-income including the new payment. `None` unless income is positive.
pub fn expected_dti(monthly_debts: f64, monthly_payment: f64, monthly_income: f64) -> Option<f64> {
    if monthly_income <= 0.0 {
        return None;
    }
    let dti = (monthly_debts + monthly_payment) / monthly_income;
    dti.is_finite().then_some(dti)
}

/// Points for a reported DTI given the recomputed one.
fn dti_points(reported: f64, expected: f64) -> f64 {
    let diff = (reported - expected).abs();
    if diff < DTI_CLOSE {
        DTI_CLOSE_POINTS
    } else if diff < DTI_NEAR {
        DTI_NEAR_POINTS
    } else if reported > 0.0 {
        DTI_ATTEMPT_POINTS
    } else {
        0.0
    }
}

/// Verifies payment, DTI and rate-to-risk coherence.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationVerifier;

impl CalculationVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for CalculationVerifier {
    fn component(&self) -> Component {
        Component::Calculations
    }

    fn score(&self, envelope: &Envelope) -> ComponentFinding {
        let lo = envelope.loan_officer();
        let ca = envelope.credit_analyst();
        let rm = envelope.risk_manager();

        let unverifiable = |reason: &str| {
            let mut tally = Tally::new(Component::Calculations);
            tally.record(
                CheckResult::skipped("CALC0", "Inputs available for recomputation").because(reason),
            );
            tally.finish()
        };

        let income = match lo.monthly_income {
            Some(income) if income > 0.0 => income,
            _ => return unverifiable("monthly_income missing or not positive"),
        };
        let (Some(annual_rate), Some(term)) = (rm.interest_rate, rm.term_months) else {
            return unverifiable("interest_rate or term_months missing");
        };

        let monthly_rate = annual_rate / 100.0 / 12.0;
        let term = term.trunc();
        if monthly_rate <= 0.0 || term <= 0.0 {
            return unverifiable("interest rate or term not positive");
        }

        let mut tally = Tally::new(self.component());
        let debts = lo.monthly_debts.unwrap_or(0.0);
        let principal = lo.loan_amount.unwrap_or(0.0);
        let payment = amortized_payment(principal, monthly_rate, term);

        // CALC1: reported DTI against the recomputed one
        let description = "Reported DTI matches recomputed DTI";
        match (payment.and_then(|p| expected_dti(debts, p, income)), ca.dti_ratio) {
            (Some(expected), Some(reported)) => {
                let points = dti_points(reported, expected);
                let check = if points > 0.0 {
                    CheckResult::earned("CALC1", description, points)
                } else {
                    CheckResult::not_earned("CALC1", description)
                };
                tally.record(
                    check
                        .because(format!(
                            "Reported {:.4}, expected {:.4} (diff {:.4})",
                            reported,
                            expected,
                            (reported - expected).abs()
                        ))
                        .with_evidence(Evidence::from_agent(
                            format!("DTI reported as {}", reported),
                            CREDIT_ANALYST,
                            "dti_ratio",
                        ))
                        .with_evidence(Evidence::recomputed(
                            format!("DTI recomputed as {:.4}", expected),
                            "dti_ratio",
                        )),
                );
            }
            (None, _) => tally.record(
                CheckResult::skipped("CALC1", description).because("DTI could not be recomputed"),
            ),
            (_, None) => tally.record(
                CheckResult::not_earned("CALC1", description).because("dti_ratio not reported"),
            ),
        }

        // CALC2: rate fits the risk tier
        let description = "Interest rate fits the assessed risk tier";
        let tier = ca.risk_assessment.as_deref().and_then(RiskTier::parse);
        let evidence = Evidence::from_agent(
            format!("Interest rate {}%", annual_rate),
            RISK_MANAGER,
            "interest_rate",
        );
        match tier {
            Some(tier) if tier.rate_range().contains(&annual_rate) => tally.record(
                CheckResult::earned("CALC2", description, RATE_TIER_POINTS)
                    .because(format!("{}% within {:?} band", annual_rate, tier))
                    .with_evidence(evidence),
            ),
            // the rate is positive past the guard above
            _ => tally.record(
                CheckResult::earned("CALC2", description, RATE_PROVIDED_POINTS)
                    .because("Rate provided but outside the tier's band")
                    .with_evidence(evidence),
            ),
        }

        // CALC3: reported payment
        let description = "Reported monthly payment within 5% of recomputed";
        match (payment.filter(|p| *p > 0.0), rm.monthly_payment) {
            (Some(expected), Some(reported)) => {
                let relative_error = (reported - expected).abs() / expected;
                let check = if relative_error < PAYMENT_TOLERANCE {
                    CheckResult::earned("CALC3", description, PAYMENT_POINTS)
                } else {
                    CheckResult::not_earned("CALC3", description)
                };
                tally.record(
                    check
                        .because(format!(
                            "Reported {:.2}, expected {:.2} ({:.1}% off)",
                            reported,
                            expected,
                            relative_error * 100.0
                        ))
                        .with_evidence(Evidence::recomputed(
                            format!("Payment recomputed as {:.2}", expected),
                            "monthly_payment",
                        )),
                );
            }
            (None, _) => tally.record(
                CheckResult::skipped("CALC3", description).because("Payment recomputed as zero"),
            ),
            (_, None) => tally.record(
                CheckResult::not_earned("CALC3", description)
                    .because("monthly_payment not reported"),
            ),
        }

        tally.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::test_support::envelope;
    use serde_json::{json, Value};

    fn sample(dti: Value, rate: Value, payment: Value, risk: &str) -> Envelope {
        envelope(json!({
            "agent_outputs": {
                "loan_officer": {
                    "monthly_income": 8000,
                    "monthly_debts": 500,
                    "loan_amount": 250000
                },
                "credit_analyst": {"dti_ratio": dti, "risk_assessment": risk},
                "risk_manager": {
                    "interest_rate": rate,
                    "term_months": 360,
                    "monthly_payment": payment
                }
            }
        }))
    }

    #[test]
    fn test_amortized_payment_known_value() {
        let payment = amortized_payment(250_000.0, 6.5 / 100.0 / 12.0, 360.0).unwrap();
        assert!((payment - 1580.17).abs() < 0.01, "payment was {}", payment);
    }

    #[test]
    fn test_amortized_payment_rejects_non_positive_inputs() {
        assert!(amortized_payment(1000.0, 0.0, 12.0).is_none());
        assert!(amortized_payment(1000.0, 0.01, 0.0).is_none());
    }

    #[test]
    fn test_dti_tolerance_bands() {
        assert_eq!(dti_points(0.40, 0.41), 0.5);
        assert_eq!(dti_points(0.48, 0.41), 0.3);
        assert_eq!(dti_points(0.90, 0.41), 0.1);
        assert_eq!(dti_points(0.0, 0.41), 0.0);
    }

    #[test]
    fn test_fully_correct_calculations() {
        let env = sample(json!(0.26), json!(6.5), json!(1580.17), "low");
        let finding = CalculationVerifier::new().score(&env);

        assert_eq!(finding.points_for("CALC1"), 0.5);
        assert_eq!(finding.points_for("CALC2"), 0.25);
        assert_eq!(finding.points_for("CALC3"), 0.25);
        assert_eq!(finding.score, 1.0);
    }

    #[test]
    fn test_dti_recomputed_041_reported_040() {
        let income = 10_000.0;
        let payment = amortized_payment(250_000.0, 6.5 / 100.0 / 12.0, 360.0).unwrap();
        let debts = 0.41 * income - payment;

        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {
                    "monthly_income": income,
                    "monthly_debts": debts,
                    "loan_amount": 250000
                },
                "credit_analyst": {"dti_ratio": 0.40},
                "risk_manager": {"interest_rate": 6.5, "term_months": 360}
            }
        }));

        let finding = CalculationVerifier::new().score(&env);
        assert_eq!(finding.points_for("CALC1"), 0.5);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let env = sample(json!("0.26"), json!("6.5"), json!("1580.17"), "LOW");
        let finding = CalculationVerifier::new().score(&env);
        assert_eq!(finding.score, 1.0);
    }

    #[test]
    fn test_rate_outside_tier_gets_partial_credit() {
        let env = sample(json!(0.26), json!(6.5), json!(1580.17), "high");
        let finding = CalculationVerifier::new().score(&env);
        assert_eq!(finding.points_for("CALC2"), 0.1);
    }

    #[test]
    fn test_missing_term_is_unverifiable() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"monthly_income": 8000, "loan_amount": 250000},
                "credit_analyst": {"dti_ratio": 0.26, "risk_assessment": "low"},
                "risk_manager": {"interest_rate": 6.5}
            }
        }));

        let finding = CalculationVerifier::new().score(&env);
        assert_eq!(finding.score, 0.0);
        assert!(matches!(
            finding.check("CALC0").unwrap().outcome,
            crate::types::CheckOutcome::Skipped
        ));
    }

    #[test]
    fn test_zero_income_is_unverifiable() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"monthly_income": 0, "loan_amount": 250000},
                "risk_manager": {"interest_rate": 6.5, "term_months": 360}
            }
        }));

        assert_eq!(CalculationVerifier::new().score(&env).score, 0.0);
    }

    #[test]
    fn test_non_positive_rate_or_term_is_unverifiable() {
        for (rate, term) in [(json!(0), json!(360)), (json!(-5), json!(360)), (json!(6.5), json!(0.5))] {
            let env = envelope(json!({
                "agent_outputs": {
                    "loan_officer": {
                        "monthly_income": 8000,
                        "monthly_debts": 500,
                        "loan_amount": 250000
                    },
                    "credit_analyst": {"dti_ratio": 0.26, "risk_assessment": "low"},
                    "risk_manager": {
                        "interest_rate": rate,
                        "term_months": term,
                        "monthly_payment": 1580.17
                    }
                }
            }));

            let finding = CalculationVerifier::new().score(&env);
            assert_eq!(finding.score, 0.0, "rate {} term {}", rate, term);
            assert!(matches!(
                finding.check("CALC0").unwrap().outcome,
                crate::types::CheckOutcome::Skipped
            ));
            assert!(finding.check("CALC2").is_none());
            assert_eq!(finding.points_for("CALC2"), 0.0);
        }
    }

    #[test]
    fn test_bad_dti_only_withholds_its_own_increment() {
        let env = sample(json!("about forty percent"), json!(6.5), json!(1580.17), "low");
        let finding = CalculationVerifier::new().score(&env);

        assert_eq!(finding.points_for("CALC1"), 0.0);
        assert_eq!(finding.points_for("CALC2"), 0.25);
        assert_eq!(finding.points_for("CALC3"), 0.25);
    }

    #[test]
    fn test_misreported_payment_withheld() {
        let env = sample(json!(0.26), json!(6.5), json!(1200.0), "low");
        let finding = CalculationVerifier::new().score(&env);
        assert_eq!(finding.points_for("CALC3"), 0.0);
        assert_eq!(finding.score, 0.75);
    }
}
