//! The parsed response envelope and its typed per-agent projections.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::coerce::{to_f64, to_text, to_text_list};

pub const LOAN_OFFICER: &str = "loan_officer";
pub const CREDIT_ANALYST: &str = "credit_analyst";
pub const RISK_MANAGER: &str = "risk_manager";

/// Agents every envelope is expected to carry.
pub const REQUIRED_AGENTS: [&str; 3] = [LOAN_OFFICER, CREDIT_ANALYST, RISK_MANAGER];

/// An underwriting decision, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Denied,
    /// Any other non-empty value, upper-cased
    Other(String),
}

impl Decision {
    /// Parse a decision string. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        match normalized.as_str() {
            "" => None,
            "APPROVED" => Some(Decision::Approved),
            "DENIED" => Some(Decision::Denied),
            _ => Some(Decision::Other(normalized)),
        }
    }

    /// Normalize a free-text recommendation by substring.
    ///
    /// "APPROV" wins over "DENI"/"DECLIN"; text mentioning neither is ignored.
    pub fn from_recommendation(text: &str) -> Option<Self> {
        let upper = text.to_uppercase();
        if upper.contains("APPROV") {
            Some(Decision::Approved)
        } else if upper.contains("DENI") || upper.contains("DECLIN") {
            Some(Decision::Denied)
        } else {
            None
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Denied)
    }
}

/// One agent's output: a loosely typed mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    name: String,
    fields: Map<String, Value>,
}

impl AgentOutput {
    pub fn new(name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the key is present, whatever its value.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric field, coerced. Absent when missing or not numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.raw(key).and_then(to_f64)
    }

    /// String field. Absent when missing or not a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.raw(key).and_then(to_text)
    }

    /// List field rendered as text.
    pub fn text_list(&self, key: &str) -> Option<Vec<String>> {
        self.raw(key).and_then(to_text_list)
    }
}

/// The parsed top-level response object.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    root: Map<String, Value>,
    agents: BTreeMap<String, AgentOutput>,
}

impl Envelope {
    /// Build an envelope from a parsed JSON object.
    ///
    /// Agents whose output is not an object are left out of `agents()`,
    /// but `agent_outputs` still counts as present.
    pub fn from_map(root: Map<String, Value>) -> Self {
        let agents = match root.get("agent_outputs") {
            Some(Value::Object(outputs)) => outputs
                .iter()
                .filter_map(|(name, value)| match value {
                    Value::Object(fields) => {
                        Some((name.clone(), AgentOutput::new(name.clone(), fields.clone())))
                    }
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Self { root, agents }
    }

    /// Whether a top-level key is present, whatever its value.
    pub fn has_field(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// The final decision, if it is a non-blank string.
    pub fn decision(&self) -> Option<Decision> {
        self.root
            .get("decision")
            .and_then(to_text)
            .and_then(Decision::parse)
    }

    /// An agent's output, when present and object-shaped.
    pub fn agent(&self, name: &str) -> Option<&AgentOutput> {
        self.agents.get(name)
    }

    /// All object-shaped agent outputs, ordered by name.
    pub fn agents(&self) -> impl Iterator<Item = &AgentOutput> {
        self.agents.values()
    }

    pub fn loan_officer(&self) -> LoanOfficerReport {
        LoanOfficerReport::from_agent(self.agent(LOAN_OFFICER))
    }

    pub fn credit_analyst(&self) -> CreditAnalystReport {
        CreditAnalystReport::from_agent(self.agent(CREDIT_ANALYST))
    }

    pub fn risk_manager(&self) -> RiskManagerReport {
        RiskManagerReport::from_agent(self.agent(RISK_MANAGER))
    }
}

/// Typed view of the loan officer's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanOfficerReport {
    pub monthly_income: Option<f64>,
    pub monthly_debts: Option<f64>,
    pub loan_amount: Option<f64>,
    pub employment_status: Option<String>,
}

impl LoanOfficerReport {
    pub fn from_agent(agent: Option<&AgentOutput>) -> Self {
        let Some(agent) = agent else {
            return Self::default();
        };

        Self {
            monthly_income: agent.number("monthly_income"),
            monthly_debts: agent.number("monthly_debts"),
            loan_amount: agent.number("loan_amount"),
            employment_status: agent.text("employment_status").map(str::to_string),
        }
    }
}

/// Typed view of the credit analyst's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditAnalystReport {
    pub credit_score: Option<f64>,
    pub credit_tier: Option<String>,
    pub dti_ratio: Option<f64>,
    pub risk_factors: Option<Vec<String>>,
    pub risk_score: Option<f64>,
    pub risk_assessment: Option<String>,
}

impl CreditAnalystReport {
    pub fn from_agent(agent: Option<&AgentOutput>) -> Self {
        let Some(agent) = agent else {
            return Self::default();
        };

        Self {
            credit_score: agent.number("credit_score"),
            credit_tier: agent.text("credit_tier").map(str::to_string),
            dti_ratio: agent.number("dti_ratio"),
            risk_factors: agent.text_list("risk_factors"),
            risk_score: agent.number("risk_score"),
            risk_assessment: agent.text("risk_assessment").map(str::to_string),
        }
    }
}

/// Typed view of the risk manager's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskManagerReport {
    pub decision: Option<Decision>,
    /// Annual rate in percent
    pub interest_rate: Option<f64>,
    pub term_months: Option<f64>,
    pub monthly_payment: Option<f64>,
}

impl RiskManagerReport {
    pub fn from_agent(agent: Option<&AgentOutput>) -> Self {
        let Some(agent) = agent else {
            return Self::default();
        };

        Self {
            decision: agent.text("decision").and_then(Decision::parse),
            interest_rate: agent.number("interest_rate"),
            term_months: agent.number("term_months"),
            monthly_payment: agent.number("monthly_payment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        match value {
            Value::Object(map) => Envelope::from_map(map),
            _ => panic!("test envelope must be an object"),
        }
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!(Decision::parse("approved"), Some(Decision::Approved));
        assert_eq!(Decision::parse(" DENIED "), Some(Decision::Denied));
        assert_eq!(
            Decision::parse("manual review"),
            Some(Decision::Other("MANUAL REVIEW".to_string()))
        );
        assert_eq!(Decision::parse("  "), None);
    }

    #[test]
    fn test_recommendation_normalization() {
        assert_eq!(
            Decision::from_recommendation("Recommend approval"),
            Some(Decision::Approved)
        );
        assert_eq!(
            Decision::from_recommendation("Application should be declined"),
            Some(Decision::Denied)
        );
        assert_eq!(
            Decision::from_recommendation("denied for high DTI"),
            Some(Decision::Denied)
        );
        // "DENY" carries neither stem
        assert_eq!(Decision::from_recommendation("deny"), None);
        assert_eq!(Decision::from_recommendation("needs more documents"), None);
    }

    #[test]
    fn test_non_object_agents_are_skipped() {
        let env = envelope(json!({
            "agent_outputs": {
                "loan_officer": {"monthly_income": "8000"},
                "credit_analyst": "not an object"
            }
        }));

        assert!(env.has_field("agent_outputs"));
        assert!(env.agent(LOAN_OFFICER).is_some());
        assert!(env.agent(CREDIT_ANALYST).is_none());
        assert_eq!(env.agents().count(), 1);
        assert_eq!(env.loan_officer().monthly_income, Some(8000.0));
    }

    #[test]
    fn test_projection_tolerates_bad_types() {
        let env = envelope(json!({
            "decision": 42,
            "agent_outputs": {
                "credit_analyst": {
                    "credit_score": "seven hundred",
                    "dti_ratio": "0.35",
                    "risk_factors": "high dti",
                    "risk_assessment": ["low"]
                },
                "risk_manager": {"decision": "approved", "interest_rate": 6.5}
            }
        }));

        let ca = env.credit_analyst();
        assert_eq!(ca.credit_score, None);
        assert_eq!(ca.dti_ratio, Some(0.35));
        assert_eq!(ca.risk_factors, None);
        assert_eq!(ca.risk_assessment, None);

        let rm = env.risk_manager();
        assert_eq!(rm.decision, Some(Decision::Approved));
        assert_eq!(rm.interest_rate, Some(6.5));
        assert_eq!(rm.term_months, None);

        assert_eq!(env.decision(), None);
    }

    #[test]
    fn test_missing_agents_project_to_defaults() {
        let env = envelope(json!({"trajectory_id": "t-1"}));
        assert!(env.has_field("trajectory_id"));
        assert_eq!(env.loan_officer(), LoanOfficerReport::default());
        assert_eq!(env.risk_manager(), RiskManagerReport::default());
    }
}
