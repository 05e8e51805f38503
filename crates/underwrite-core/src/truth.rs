//! Companion reward driven by pre-labeled truth.
//!
//! The dataset pipeline attaches a `reward_breakdown` mapping of
//! component name to pass/fail. The reward is 1.0 only when every component
//! passed. Failed samples carry a larger `sample_weight` so training can
//! focus on them.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::reward_fn::RewardFn;
use crate::types::{Response, RewardOutput};

const FAILED_COMPONENT_WEIGHT: f64 = 0.3;

/// Loose truthiness, the way the labeling pipeline writes its flags.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Decode the truth payload, which may arrive as JSON text or already decoded.
fn truth_object(truth: &Value) -> Option<Map<String, Value>> {
    if !is_truthy(truth) {
        return None;
    }

    let decoded = match truth {
        Value::String(text) => serde_json::from_str(text).ok()?,
        other => other.clone(),
    };

    match decoded {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Binary reward from the truth's `reward_breakdown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthBreakdownReward;

impl TruthBreakdownReward {
    pub const NAME: &'static str = "truth_breakdown_reward";

    pub fn new() -> Self {
        Self
    }
}

impl RewardFn for TruthBreakdownReward {
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
        let Some(truth) = truth.and_then(truth_object) else {
            tracing::debug!("Truth missing or not a mapping, reward is 0.0");
            return RewardOutput::Scalar(0.0);
        };

        let breakdown = match truth.get("reward_breakdown") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let failed_components: Vec<String> = breakdown
            .iter()
            .filter(|(_, passed)| !is_truthy(passed))
            .map(|(name, _)| name.clone())
            .collect();
        let all_passed = !breakdown.is_empty() && failed_components.is_empty();
        let final_reward = if all_passed { 1.0 } else { 0.0 };

        if !return_dict {
            return RewardOutput::Scalar(final_reward);
        }

        let sample_weight = 1.0 + failed_components.len() as f64 * FAILED_COMPONENT_WEIGHT;
        let business_impact_cost = truth
            .get("business_impact")
            .and_then(|impact| impact.get("estimated_cost_usd"))
            .cloned()
            .unwrap_or(Value::from(0));
        let mcp_server_calls = truth
            .get("mcp_server_calls")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);

        let mut map = BTreeMap::new();
        map.insert("final_reward".to_string(), Value::from(final_reward));
        map.insert("sample_weight".to_string(), Value::from(sample_weight));
        map.insert(
            "failed_components".to_string(),
            Value::from(failed_components),
        );
        map.insert("breakdown".to_string(), Value::Object(breakdown));
        map.insert("response_length".to_string(), Value::from(response.len()));
        map.insert("business_impact_cost".to_string(), business_impact_cost);
        map.insert("mcp_server_calls".to_string(), Value::from(mcp_server_calls));
        RewardOutput::Breakdown(map)
    }
}
