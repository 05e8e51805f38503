//! The reward-function seam a training host calls into.

use std::sync::Arc;

use serde_json::Value;

use crate::config::RewardConfig;
use crate::types::{Response, RewardOutput};
use crate::ScoringEngine;

/// A reward function with the host's call signature.
///
/// Implementations never fail; the worst outcome is a reward of 0.0.
pub trait RewardFn: Send + Sync {
    /// Registry name of the reward function.
    fn name(&self) -> &'static str;

    /// Score one response.
    ///
    /// `prompt` and `truth` are passed through by the host; a variant uses
    /// whichever it needs. With `return_dict` the result is a breakdown
    /// mapping instead of a scalar.
    fn call(
        &self,
        response: &Response,
        prompt: Option<&str>,
        truth: Option<&Value>,
        return_dict: bool,
    ) -> RewardOutput;
}

/// The rule-based underwriting reward.
///
/// Ignores `prompt` and `truth`. In breakdown mode it returns exactly
/// `{"reward": r}` so hosts that sum mapping values do not double count.
#[derive(Debug, Clone)]
pub struct LoanUnderwritingReward {
    engine: Arc<ScoringEngine>,
}

impl LoanUnderwritingReward {
    pub const NAME: &'static str = "loan_underwriting_reward";

    pub fn new(engine: Arc<ScoringEngine>) -> Self {
        Self { engine }
    }

    pub fn with_config(config: RewardConfig) -> Self {
        Self::new(Arc::new(ScoringEngine::new(config)))
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }
}

impl Default for LoanUnderwritingReward {
    fn default() -> Self {
        Self::with_config(RewardConfig::default())
    }
}

impl RewardFn for LoanUnderwritingReward {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn call(
        &self,
        response: &Response,
        _prompt: Option<&str>,
        truth: Option<&Value>,
        return_dict: bool,
    ) -> RewardOutput {
        tracing::debug!(
            response_length = response.len(),
            has_truth = truth.is_some(),
            return_dict,
            "Scoring response"
        );

        let reward = self.engine.reward(response);
        if return_dict {
            RewardOutput::reward_only(reward)
        } else {
            RewardOutput::Scalar(reward)
        }
    }
}
