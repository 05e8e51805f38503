//! # underwrite-core
//!
//! Rule-based verification and reward engine for multi-agent loan
//! underwriting transcripts.
//!
//! A transcript is a JSON envelope holding the outputs of a loan officer, a
//! credit analyst and a risk manager plus a final decision. The engine
//! answers one question per transcript: how much reward does it earn?
//!
//! ## Key Guarantees
//!
//! 1. **Verifiable**: Payment and DTI are recomputed, never taken on trust
//! 2. **Total**: Every input gets a reward in [0, 1]; nothing panics or errors
//! 3. **Deterministic up to noise**: The pre-noise assessment is bit-identical
//!    across calls; only the final ±0.02 tie-breaker varies
//! 4. **Parallel-safe**: No shared mutable state; noise comes from the
//!    calling thread's generator
//!
//! ## Example
//!
//! ```rust,ignore
//! use underwrite_core::{score, Outcome, ScoringEngine, RewardConfig};
//!
//! let reward = score(response_text, None, None, false);
//!
//! let engine = ScoringEngine::new(RewardConfig::from_yaml_file("calibration.yaml")?);
//! let evaluation = engine.evaluate(&response_text.into());
//! match evaluation.assessment.outcome {
//!     Outcome::Banded { band } => println!("{:?}: {}", band, evaluation.reward),
//!     Outcome::Gated { structure } => println!("structure {} below gate", structure),
//!     Outcome::Malformed { reason } => println!("malformed: {}", reason),
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod envelope;
pub mod evidence;
pub mod reward_fn;
pub mod scorers;
pub mod truth;
pub mod types;

// Re-export main types at crate root
pub use aggregator::ScoreAggregator;
pub use config::{BandRule, BandTable, ComponentWeights, ConfigError, RewardConfig};
pub use envelope::{Decision, Envelope, MalformedResponse, ResponseParser};
pub use evidence::{Evidence, EvidenceSource};
pub use reward_fn::{LoanUnderwritingReward, RewardFn};
pub use scorers::{
    CalculationVerifier, ConsistencyScorer, DecisionLogicScorer, RiskAssessmentScorer, Scorer,
    StructureValidator,
};
pub use truth::TruthBreakdownReward;
pub use types::{
    Assessment, CheckOutcome, CheckResult, Component, ComponentFinding, Evaluation, Outcome,
    Response, RewardBand, RewardOutput, ScoreComponents,
};

use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use serde_json::Value;

lazy_static! {
    /// Engine with the default calibration, shared by the free functions.
    static ref DEFAULT_ENGINE: ScoringEngine = ScoringEngine::default();
}

/// Scores responses under one calibration.
///
/// Holds only immutable configuration, so one engine can be shared across
/// threads behind an `Arc` or a `static`.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: RewardConfig,
    parser: ResponseParser,
}

impl ScoringEngine {
    pub fn new(config: RewardConfig) -> Self {
        Self {
            config,
            parser: ResponseParser::new(),
        }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Deterministic assessment of a response: everything but the noise.
    pub fn assess(&self, response: &Response) -> Assessment {
        match self.parser.parse(response) {
            Ok(envelope) => self.assess_envelope(&envelope),
            Err(err) => {
                tracing::warn!(error = %err, "Malformed response, reward is 0.0");
                ScoreAggregator::new(&self.config).malformed(err.to_string())
            }
        }
    }

    /// Assess an already-parsed envelope.
    ///
    /// Structure runs first; below the gate nothing else is scored.
    pub fn assess_envelope(&self, envelope: &Envelope) -> Assessment {
        let aggregator = ScoreAggregator::new(&self.config);

        let structure = StructureValidator::new().score(envelope);
        if !aggregator.passes_gate(structure.score) {
            return aggregator.gated(structure);
        }

        let scorers: [&dyn Scorer; 4] = [
            &CalculationVerifier,
            &RiskAssessmentScorer,
            &DecisionLogicScorer,
            &ConsistencyScorer,
        ];

        let mut findings = Vec::with_capacity(Component::ALL.len());
        findings.push(structure);
        findings.extend(scorers.iter().map(|scorer| scorer.score(envelope)));

        aggregator.aggregate(findings)
    }

    /// Attach noise and a timestamp to an assessment.
    pub fn finalize<R: Rng>(&self, assessment: Assessment, rng: &mut R) -> Evaluation {
        let reward = ScoreAggregator::new(&self.config).jitter(&assessment, rng);

        tracing::debug!(
            raw = assessment.weighted_score,
            outcome = ?assessment.outcome,
            reward,
            "Reward calculated"
        );

        Evaluation {
            assessment,
            reward,
            evaluated_at: Utc::now(),
        }
    }

    /// Full evaluation, with noise from the calling thread's generator.
    pub fn evaluate(&self, response: &Response) -> Evaluation {
        self.evaluate_with_rng(response, &mut rand::thread_rng())
    }

    /// Full evaluation with an explicit noise source.
    pub fn evaluate_with_rng<R: Rng>(&self, response: &Response, rng: &mut R) -> Evaluation {
        self.finalize(self.assess(response), rng)
    }

    /// The final reward alone.
    pub fn reward(&self, response: &Response) -> f64 {
        self.evaluate(response).reward
    }
}

/// Score a response with the default calibration.
///
/// Returns the scalar reward, or `{"reward": r}` with `return_dict`.
/// `prompt` and `truth` are accepted for host compatibility and ignored.
pub fn score(
    response: impl Into<Response>,
    prompt: Option<&str>,
    truth: Option<&Value>,
    return_dict: bool,
) -> RewardOutput {
    let reward = DEFAULT_ENGINE.reward(&response.into());
    tracing::trace!(has_prompt = prompt.is_some(), has_truth = truth.is_some(), reward);

    if return_dict {
        RewardOutput::reward_only(reward)
    } else {
        RewardOutput::Scalar(reward)
    }
}

/// Score a response against its pre-labeled truth breakdown.
pub fn score_with_truth(
    response: impl Into<Response>,
    prompt: Option<&str>,
    truth: Option<&Value>,
    return_dict: bool,
) -> RewardOutput {
    TruthBreakdownReward::new().call(&response.into(), prompt, truth, return_dict)
}

/// Full evaluation with the default calibration.
pub fn evaluate(response: impl Into<Response>) -> Evaluation {
    DEFAULT_ENGINE.evaluate(&response.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn excellent_envelope() -> Value {
        json!({
            "trajectory_id": "traj-0001",
            "decision": "APPROVED",
            "agent_outputs": {
                "loan_officer": {
                    "monthly_income": 8000,
                    "monthly_debts": 500,
                    "loan_amount": 250000,
                    "employment_status": "employed",
                    "recommendation": "APPROVED"
                },
                "credit_analyst": {
                    "credit_score": 780,
                    "credit_tier": "excellent",
                    "dti_ratio": 0.26,
                    "risk_factors": ["Large loan amount relative to savings"],
                    "risk_score": 2,
                    "risk_assessment": "low",
                    "recommendation": "APPROVED",
                    "monthly_income": 8000
                },
                "risk_manager": {
                    "decision": "APPROVED",
                    "interest_rate": 6.5,
                    "term_months": 360,
                    "monthly_payment": 1580.17,
                    "loan_amount": 250000
                }
            }
        })
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_excellent_transcript() {
        let engine = ScoringEngine::default();
        let assessment = engine.assess(&Response::from(excellent_envelope()));

        assert_close(assessment.components.structure, 1.0);
        assert_close(assessment.components.calculations, 1.0);
        assert_close(assessment.components.risk_assessment, 0.8);
        assert_close(assessment.components.decision_logic, 0.8);
        assert_close(assessment.components.consistency, 1.0);
        assert_close(assessment.weighted_score, 0.92);
        assert_eq!(assessment.outcome.band(), Some(RewardBand::Excellent));

        let reward = engine.reward(&Response::from(excellent_envelope()));
        assert!((0.98..=1.0).contains(&reward));
    }

    #[test]
    fn test_fenced_text_scores_like_structured() {
        let engine = ScoringEngine::default();
        let text = format!("```json\n{}\n```", excellent_envelope());

        assert_eq!(
            engine.assess(&Response::text(text)),
            engine.assess(&Response::from(excellent_envelope()))
        );
    }

    #[test]
    fn test_malformed_text_is_exactly_zero() {
        for text in ["this is not json", "```json\n{\"decision\": ", "42", "[]"] {
            let evaluation = evaluate(text);
            assert!(evaluation.assessment.outcome.is_malformed());
            assert_eq!(evaluation.reward, 0.0);
        }
    }

    #[test]
    fn test_missing_agent_outputs_is_gated() {
        let response = json!({"trajectory_id": "t-1", "decision": "APPROVED"});
        let evaluation = evaluate(response);

        assert!(evaluation.assessment.outcome.is_gated());
        assert!(evaluation.reward <= 0.08 + 1e-12);
        assert_eq!(evaluation.assessment.findings.len(), 1);
        assert_eq!(evaluation.assessment.components.consistency, 0.0);
    }

    #[test]
    fn test_dict_mode_returns_only_reward() {
        let output = score(excellent_envelope(), None, None, true);
        let map = output.as_breakdown().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map["reward"].as_f64().unwrap() >= 0.98);

        let gated = score(json!({"decision": "DENIED"}), Some("prompt"), None, true);
        assert_eq!(gated.as_breakdown().unwrap().len(), 1);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let engine = ScoringEngine::default();
        let response = Response::from(excellent_envelope());

        let a = engine.evaluate_with_rng(&response, &mut StdRng::seed_from_u64(3));
        let b = engine.evaluate_with_rng(&response, &mut StdRng::seed_from_u64(3));
        assert_eq!(a.reward, b.reward);
        assert_eq!(a.assessment, b.assessment);
    }

    #[test]
    fn test_custom_calibration_changes_band_reward() {
        let config = RewardConfig {
            noise_amplitude: 0.0,
            bands: BandTable {
                excellent: BandRule {
                    min_score: 0.95,
                    reward: 1.0,
                },
                ..BandTable::default()
            },
            ..RewardConfig::default()
        };
        let engine = ScoringEngine::new(config);

        assert_eq!(engine.reward(&Response::from(excellent_envelope())), 0.4);
    }

    #[test]
    fn test_score_with_truth() {
        let truth = json!({"reward_breakdown": {"dti": true}});
        assert_eq!(
            score_with_truth("{}", None, Some(&truth), false),
            RewardOutput::Scalar(1.0)
        );
    }
}
