//! Runtime configuration, loaded from YAML.
//!
//! ```yaml
//! reward_kind: rule_based
//! concurrency: 8
//! cache:
//!   enabled: true
//!   max_entries: 10000
//!   ttl: 1h
//! calibration: calibration.yaml
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use underwrite_core::RewardConfig;

use crate::factory::RewardKind;
use crate::RuntimeError;

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    pub max_entries: u64,

    /// Time to live, as a human-readable duration ("30m", "1h")
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Configuration for batch scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Which reward function to run
    pub reward_kind: RewardKind,

    /// Maximum responses scored at once
    pub concurrency: usize,

    pub cache: CacheConfig,

    /// Reward calibration file; defaults apply when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            reward_kind: RewardKind::RuleBased,
            concurrency: 8,
            cache: CacheConfig::default(),
            calibration: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a runtime config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a runtime config from a YAML file.
    ///
    /// A relative `calibration` path resolves against the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        if let (Some(calibration), Some(dir)) = (&config.calibration, path.parent()) {
            if calibration.is_relative() {
                config.calibration = Some(dir.join(calibration));
            }
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), RuntimeError> {
        if self.concurrency == 0 {
            return Err(RuntimeError::ValidationError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.cache.enabled {
            if self.cache.max_entries == 0 {
                return Err(RuntimeError::ValidationError(
                    "cache.max_entries must be at least 1".to_string(),
                ));
            }
            if self.cache.ttl.is_zero() {
                return Err(RuntimeError::ValidationError(
                    "cache.ttl must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Load the reward calibration this config points at.
    pub fn reward_config(&self) -> Result<RewardConfig, RuntimeError> {
        match &self.calibration {
            Some(path) => Ok(RewardConfig::from_file(path)?),
            None => Ok(RewardConfig::default()),
        }
    }
}
