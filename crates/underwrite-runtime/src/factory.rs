//! Builds the reward function a runtime config names.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use underwrite_core::{LoanUnderwritingReward, RewardConfig, RewardFn, TruthBreakdownReward};

use crate::RuntimeError;

/// The available reward functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Rule-based verification of the transcript itself
    RuleBased,

    /// Pass/fail labels supplied with the sample
    TruthBreakdown,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardKind::RuleBased => "rule_based",
            RewardKind::TruthBreakdown => "truth_breakdown",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "rule_based" => Ok(RewardKind::RuleBased),
            "truth_breakdown" => Ok(RewardKind::TruthBreakdown),
            other => Err(RuntimeError::UnknownRewardKind(other.to_string())),
        }
    }
}

/// Create a reward function of the given kind.
///
/// The calibration only affects the rule-based kind.
pub fn create_reward_fn(kind: RewardKind, config: RewardConfig) -> Arc<dyn RewardFn> {
    tracing::debug!(kind = %kind, "Creating reward function");
    match kind {
        RewardKind::RuleBased => Arc::new(LoanUnderwritingReward::with_config(config)),
        RewardKind::TruthBreakdown => Arc::new(TruthBreakdownReward::new()),
    }
}
