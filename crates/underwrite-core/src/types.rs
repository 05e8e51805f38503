//! Core value types shared by the parser, scorers and aggregator.
//!
//! Everything here is a transient value object: built once per scoring call,
//! never mutated after the aggregator hands it back, and safe to send across
//! threads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evidence::Evidence;

/// Raw model output handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Model text, possibly wrapped in a ```` ```json ```` fence.
    Text(String),

    /// An envelope the caller already decoded.
    Structured(Value),
}

impl Response {
    /// Create a text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Length as the host measures it: characters for text, entries for
    /// containers.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Structured(Value::Object(map)) => map.len(),
            Self::Structured(Value::Array(items)) => items.len(),
            Self::Structured(Value::String(text)) => text.chars().count(),
            Self::Structured(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

/// The five scored components, in aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Structure,
    Calculations,
    RiskAssessment,
    DecisionLogic,
    Consistency,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Structure,
        Component::Calculations,
        Component::RiskAssessment,
        Component::DecisionLogic,
        Component::Consistency,
    ];

    /// Snake-case name used in breakdowns and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Component::Structure => "structure",
            Component::Calculations => "calculations",
            Component::RiskAssessment => "risk_assessment",
            Component::DecisionLogic => "decision_logic",
            Component::Consistency => "consistency",
        }
    }
}

/// Result of one check inside a scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The increment was earned.
    Earned { points: f64 },

    /// The check ran and the increment was withheld.
    NotEarned,

    /// The check could not run (inputs missing).
    Skipped,
}

impl CheckOutcome {
    pub fn points(&self) -> f64 {
        match self {
            CheckOutcome::Earned { points } => *points,
            _ => 0.0,
        }
    }

    pub fn is_earned(&self) -> bool {
        matches!(self, CheckOutcome::Earned { .. })
    }
}

/// Record of a single check, with the evidence it looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Stable identifier (e.g., "CALC1")
    pub check_id: String,

    /// What the check looks for
    pub description: String,

    pub outcome: CheckOutcome,

    /// Why the outcome came out this way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

impl CheckResult {
    fn with_outcome(check_id: &str, description: &str, outcome: CheckOutcome) -> Self {
        Self {
            check_id: check_id.to_string(),
            description: description.to_string(),
            outcome,
            rationale: None,
            evidence: Vec::new(),
        }
    }

    pub fn earned(check_id: &str, description: &str, points: f64) -> Self {
        Self::with_outcome(check_id, description, CheckOutcome::Earned { points })
    }

    pub fn not_earned(check_id: &str, description: &str) -> Self {
        Self::with_outcome(check_id, description, CheckOutcome::NotEarned)
    }

    pub fn skipped(check_id: &str, description: &str) -> Self {
        Self::with_outcome(check_id, description, CheckOutcome::Skipped)
    }

    pub fn because(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }
}

/// What one scorer observed about a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFinding {
    pub component: Component,

    /// Score in [0, 1], already capped
    pub score: f64,

    pub checks: Vec<CheckResult>,
}

impl ComponentFinding {
    /// A finding with no checks and a zero score.
    pub fn zero(component: Component) -> Self {
        Self {
            component,
            score: 0.0,
            checks: Vec::new(),
        }
    }

    /// Look up a check by id.
    pub fn check(&self, check_id: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.check_id == check_id)
    }

    /// Points awarded by a check, zero when absent or withheld.
    pub fn points_for(&self, check_id: &str) -> f64 {
        self.check(check_id).map(|c| c.outcome.points()).unwrap_or(0.0)
    }
}

/// Per-component scores, each clamped to [0, 1] before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub structure: f64,
    pub calculations: f64,
    pub risk_assessment: f64,
    pub decision_logic: f64,
    pub consistency: f64,
}

impl ScoreComponents {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Structure => self.structure,
            Component::Calculations => self.calculations,
            Component::RiskAssessment => self.risk_assessment,
            Component::DecisionLogic => self.decision_logic,
            Component::Consistency => self.consistency,
        }
    }

    /// Store a component score, clamped to [0, 1].
    pub fn set(&mut self, component: Component, score: f64) {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match component {
            Component::Structure => self.structure = score,
            Component::Calculations => self.calculations = score,
            Component::RiskAssessment => self.risk_assessment = score,
            Component::DecisionLogic => self.decision_logic = score,
            Component::Consistency => self.consistency = score,
        }
    }
}

/// Discrete reward band, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardBand {
    Worst,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl RewardBand {
    pub const ALL: [RewardBand; 5] = [
        RewardBand::Worst,
        RewardBand::Poor,
        RewardBand::Fair,
        RewardBand::Good,
        RewardBand::Excellent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RewardBand::Worst => "worst",
            RewardBand::Poor => "poor",
            RewardBand::Fair => "fair",
            RewardBand::Good => "good",
            RewardBand::Excellent => "excellent",
        }
    }

    /// Position in `ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// How a scoring call ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Not parseable, or not an object. Reward is exactly 0.0.
    Malformed { reason: String },

    /// Structure score fell below the gate; only the weighted structure term counts.
    Gated { structure: f64 },

    /// Full evaluation, mapped to a band.
    Banded { band: RewardBand },
}

impl Outcome {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Outcome::Malformed { .. })
    }

    pub fn is_gated(&self) -> bool {
        matches!(self, Outcome::Gated { .. })
    }

    pub fn band(&self) -> Option<RewardBand> {
        match self {
            Outcome::Banded { band } => Some(*band),
            _ => None,
        }
    }
}

/// The deterministic part of an evaluation: everything but the noise term.
///
/// Two assessments of the same response are bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub outcome: Outcome,

    pub components: ScoreComponents,

    /// Findings in aggregation order; only structure when gated, empty when malformed
    pub findings: Vec<ComponentFinding>,

    /// Weighted sum of the components
    pub weighted_score: f64,

    /// Band reward (or the gated structure term) before noise
    pub base_reward: f64,
}

/// A complete evaluation: the assessment plus the final, noisy reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub assessment: Assessment,

    /// Final reward in [0, 1]
    pub reward: f64,

    pub evaluated_at: DateTime<Utc>,
}

/// What a reward function returns to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardOutput {
    Scalar(f64),
    Breakdown(BTreeMap<String, Value>),
}

impl RewardOutput {
    /// The single-key breakdown `{"reward": r}`.
    pub fn reward_only(reward: f64) -> Self {
        let mut map = BTreeMap::new();
        map.insert("reward".to_string(), Value::from(reward));
        RewardOutput::Breakdown(map)
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            RewardOutput::Scalar(value) => Some(*value),
            RewardOutput::Breakdown(_) => None,
        }
    }

    pub fn as_breakdown(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            RewardOutput::Scalar(_) => None,
            RewardOutput::Breakdown(map) => Some(map),
        }
    }

    /// JSON form: a number, or an object.
    pub fn to_value(&self) -> Value {
        match self {
            RewardOutput::Scalar(value) => Value::from(*value),
            RewardOutput::Breakdown(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ),
        }
    }
}
