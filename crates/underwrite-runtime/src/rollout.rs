//! Rollout adapter: writes rewards back onto a host's experiences.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use underwrite_core::truth::is_truthy;
use underwrite_core::{Response, RewardFn, RewardOutput};

const WORKFLOW: &str = "loan_underwriting";
const REWARD_TYPE: &str = "custom_loan_underwriting";

/// One sampled response and what the host knows about it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub response_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<Value>,

    /// Reward precomputed by the dataset pipeline, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth_reward: Option<f64>,

    #[serde(default)]
    pub reward: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, Value>>,

    #[serde(default)]
    pub info: BTreeMap<String, Value>,
}

impl Experience {
    pub fn new(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            ..Self::default()
        }
    }

    pub fn with_truth(mut self, truth: Value) -> Self {
        self.truth = Some(truth);
        self
    }

    fn prompt_text(&self) -> Option<String> {
        match &self.prompt {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Scores experiences in place with one reward function.
#[derive(Clone)]
pub struct RolloutScorer {
    reward_fn: Arc<dyn RewardFn>,
    is_eval: bool,
}

impl RolloutScorer {
    pub fn new(reward_fn: Arc<dyn RewardFn>) -> Self {
        Self {
            reward_fn,
            is_eval: false,
        }
    }

    /// In eval mode every experience also gets a metrics breakdown.
    pub fn eval_mode(mut self, is_eval: bool) -> Self {
        self.is_eval = is_eval;
        self
    }

    pub fn reward_fn_name(&self) -> &'static str {
        self.reward_fn.name()
    }

    /// Score every experience, tagging its info.
    pub fn score(&self, experiences: &mut [Experience]) {
        tracing::info!(
            count = experiences.len(),
            reward_fn = self.reward_fn_name(),
            is_eval = self.is_eval,
            "Scoring rollout"
        );
        for experience in experiences.iter_mut() {
            self.score_one(experience);
        }
    }

    fn score_one(&self, experience: &mut Experience) {
        let response = Response::text(experience.response_text.clone());
        let prompt = experience.prompt_text();
        let truth = experience.truth.as_ref();

        let output = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reward_fn
                .call(&response, prompt.as_deref(), truth, self.is_eval)
        }));

        match output {
            Ok(RewardOutput::Scalar(reward)) => {
                experience.reward = reward;
            }
            Ok(RewardOutput::Breakdown(breakdown)) => {
                experience.reward = collapse(&breakdown);
                experience.metrics = Some(breakdown);
            }
            Err(_) => {
                tracing::error!(
                    reward_fn = self.reward_fn_name(),
                    "Reward function panicked, reward is 0.0"
                );
                experience.reward = 0.0;
                if self.is_eval {
                    let mut metrics = BTreeMap::new();
                    metrics.insert("reward".to_string(), Value::from(0.0));
                    experience.metrics = Some(metrics);
                }
            }
        }

        let has_truth = experience.truth.as_ref().is_some_and(is_truthy);
        let info = &mut experience.info;
        info.insert("workflow".to_string(), Value::from(WORKFLOW));
        info.insert("reward_type".to_string(), Value::from(REWARD_TYPE));
        info.insert("reward_fn".to_string(), Value::from(self.reward_fn_name()));
        info.insert("has_truth".to_string(), Value::from(has_truth));
        info.insert(
            "truth_reward".to_string(),
            Value::from(experience.truth_reward.unwrap_or(0.0)),
        );
    }
}

/// Scalar reward of a breakdown: its `reward` key, else the sum of numbers.
fn collapse(breakdown: &BTreeMap<String, Value>) -> f64 {
    if let Some(reward) = breakdown.get("reward").and_then(Value::as_f64) {
        return reward;
    }
    breakdown.values().filter_map(Value::as_f64).sum()
}
