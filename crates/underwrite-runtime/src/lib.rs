//! # underwrite-runtime
//!
//! Batch scoring for a reinforcement-learning host.
//!
//! The core engine scores one response at a time and never blocks. This crate
//! adds what a training loop needs around it:
//! - Concurrent fan-out over a batch on the tokio blocking pool
//! - A cache of deterministic assessments, re-noised on every hit
//! - Band-distribution statistics to watch class imbalance
//! - The rollout adapter that writes rewards back onto experiences
//!
//! ## Example
//!
//! ```rust,ignore
//! use underwrite_runtime::{BatchScorer, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("runtime.yaml")?;
//! let scorer = BatchScorer::from_config(&config)?;
//!
//! let evaluations = scorer.score_batch(responses).await;
//! println!("{:?}", scorer.stats().snapshot());
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod factory;
pub mod rollout;
pub mod stats;

pub use batch::BatchScorer;
pub use cache::{CacheKey, EvaluationCache};
pub use config::{CacheConfig, RuntimeConfig};
pub use factory::{create_reward_fn, RewardKind};
pub use rollout::{Experience, RolloutScorer};
pub use stats::{ScoringStats, StatsSnapshot};

use thiserror::Error;
use underwrite_core::ConfigError;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to read runtime config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse runtime config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid reward calibration: {0}")]
    Calibration(#[from] ConfigError),

    #[error("Runtime config validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown reward kind: '{0}'. Available: rule_based, truth_breakdown")]
    UnknownRewardKind(String),
}
