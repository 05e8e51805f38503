//! Structure validation.
//!
//! Scores the presence and shape of required fields. This score also gates
//! the rest of the evaluation: below the configured gate nothing else runs.

use crate::envelope::{Envelope, CREDIT_ANALYST, LOAN_OFFICER, REQUIRED_AGENTS, RISK_MANAGER};
use crate::evidence::Evidence;
use crate::types::{CheckResult, Component, ComponentFinding};

use super::{Scorer, Tally};

const TOP_LEVEL_FIELDS: [&str; 3] = ["agent_outputs", "decision", "trajectory_id"];
const TOP_LEVEL_POINTS: f64 = 0.2;
const AGENT_POINTS: f64 = 0.13;
const AGENT_FIELDS_POINTS: f64 = 0.1;

/// Critical fields each agent must report.
const AGENT_REQUIRED_FIELDS: [(&str, &[&str]); 3] = [
    (LOAN_OFFICER, &["monthly_income", "monthly_debts", "loan_amount"]),
    (CREDIT_ANALYST, &["dti_ratio", "credit_score", "risk_assessment"]),
    (RISK_MANAGER, &["decision", "interest_rate"]),
];

/// Scores required top-level fields, agents, and per-agent fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureValidator;

impl StructureValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for StructureValidator {
    fn component(&self) -> Component {
        Component::Structure
    }

    fn score(&self, envelope: &Envelope) -> ComponentFinding {
        let mut tally = Tally::new(self.component());
        let mut check_no = 0;
        let mut next_id = || {
            check_no += 1;
            format!("STR{}", check_no)
        };

        for field in TOP_LEVEL_FIELDS {
            let id = next_id();
            let description = format!("Top-level field `{}` present", field);
            if envelope.has_field(field) {
                tally.record(
                    CheckResult::earned(&id, &description, TOP_LEVEL_POINTS)
                        .with_evidence(Evidence::from_field("Field present", field)),
                );
            } else {
                tally.record(CheckResult::not_earned(&id, &description).because("Field missing"));
            }
        }

        for agent in REQUIRED_AGENTS {
            let id = next_id();
            let description = format!("Agent `{}` present as an object", agent);
            if envelope.agent(agent).is_some() {
                tally.record(CheckResult::earned(&id, &description, AGENT_POINTS));
            } else {
                tally.record(
                    CheckResult::not_earned(&id, &description)
                        .because("Agent missing or not an object"),
                );
            }
        }

        for (agent, fields) in AGENT_REQUIRED_FIELDS {
            let id = next_id();
            let description = format!("Agent `{}` reports {}", agent, fields.join(", "));
            let missing: Vec<&str> = match envelope.agent(agent) {
                Some(output) => fields.iter().copied().filter(|f| !output.has(f)).collect(),
                None => fields.to_vec(),
            };

            if missing.is_empty() {
                tally.record(CheckResult::earned(&id, &description, AGENT_FIELDS_POINTS));
            } else {
                tally.record(
                    CheckResult::not_earned(&id, &description)
                        .because(format!("Missing: {}", missing.join(", "))),
                );
            }
        }

        tally.finish()
    }
}
