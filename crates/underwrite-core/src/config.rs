//! Reward calibration: component weights, structure gate, band table, noise.
//!
//! A `RewardConfig` is built once and shared read-only by every scoring call.
//! `Default` reproduces the production calibration; YAML or JSON files may
//! override any subset of fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::{Component, RewardBand};

/// Errors that can occur when loading a calibration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Weight of each component in the final weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub structure: f64,
    pub calculations: f64,
    pub risk_assessment: f64,
    pub decision_logic: f64,
    pub consistency: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            structure: 0.2,
            calculations: 0.25,
            risk_assessment: 0.2,
            decision_logic: 0.2,
            consistency: 0.15,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Structure => self.structure,
            Component::Calculations => self.calculations,
            Component::RiskAssessment => self.risk_assessment,
            Component::DecisionLogic => self.decision_logic,
            Component::Consistency => self.consistency,
        }
    }

    pub fn sum(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Lower bound of a band and the base reward it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRule {
    pub min_score: f64,
    pub reward: f64,
}

/// Band thresholds, highest first. Anything below `poor` is `Worst`.
///
/// The `Good` band deliberately pays less than its raw score suggests, so a
/// policy cannot settle on the majority behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandTable {
    pub excellent: BandRule,
    pub good: BandRule,
    pub fair: BandRule,
    pub poor: BandRule,
    pub worst_reward: f64,
}

impl Default for BandTable {
    fn default() -> Self {
        Self {
            excellent: BandRule {
                min_score: 0.90,
                reward: 1.0,
            },
            good: BandRule {
                min_score: 0.75,
                reward: 0.4,
            },
            fair: BandRule {
                min_score: 0.60,
                reward: 0.3,
            },
            poor: BandRule {
                min_score: 0.40,
                reward: 0.15,
            },
            worst_reward: 0.0,
        }
    }
}

impl BandTable {
    fn ranked(&self) -> [(RewardBand, BandRule); 4] {
        [
            (RewardBand::Excellent, self.excellent),
            (RewardBand::Good, self.good),
            (RewardBand::Fair, self.fair),
            (RewardBand::Poor, self.poor),
        ]
    }

    /// Band for a weighted score. Thresholds are inclusive lower bounds.
    pub fn classify(&self, score: f64) -> RewardBand {
        self.ranked()
            .into_iter()
            .find(|(_, rule)| score >= rule.min_score)
            .map(|(band, _)| band)
            .unwrap_or(RewardBand::Worst)
    }

    /// Base reward for a band.
    pub fn reward(&self, band: RewardBand) -> f64 {
        match band {
            RewardBand::Excellent => self.excellent.reward,
            RewardBand::Good => self.good.reward,
            RewardBand::Fair => self.fair.reward,
            RewardBand::Poor => self.poor.reward,
            RewardBand::Worst => self.worst_reward,
        }
    }
}

/// The complete reward calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub weights: ComponentWeights,

    /// Structure scores below this stop the evaluation
    pub structure_gate: f64,

    pub bands: BandTable,

    /// Half-width of the uniform tie-breaking noise
    pub noise_amplitude: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            structure_gate: 0.5,
            bands: BandTable::default(),
            noise_amplitude: 0.02,
        }
    }
}

impl RewardConfig {
    /// Parse a calibration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RewardConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a calibration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RewardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load by extension: `.json` is JSON, anything else YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Check the calibration is internally coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for component in Component::ALL {
            let weight = self.weights.get(component);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "Weight for {} must be a non-negative number, got {}",
                    component.name(),
                    weight
                )));
            }
        }

        let total = self.weights.sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::ValidationError(format!(
                "Component weights must sum to 1.0, got {}",
                total
            )));
        }

        if !(0.0..=1.0).contains(&self.structure_gate) {
            return Err(ConfigError::ValidationError(format!(
                "structure_gate must be in [0, 1], got {}",
                self.structure_gate
            )));
        }

        if !(0.0..=0.5).contains(&self.noise_amplitude) {
            return Err(ConfigError::ValidationError(format!(
                "noise_amplitude must be in [0, 0.5], got {}",
                self.noise_amplitude
            )));
        }

        self.validate_bands()
    }

    fn validate_bands(&self) -> Result<(), ConfigError> {
        let mut ceiling = f64::INFINITY;
        for (band, rule) in self.bands.ranked() {
            if !(rule.min_score > 0.0 && rule.min_score <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "Threshold for {} must be in (0, 1], got {}",
                    band.name(),
                    rule.min_score
                )));
            }
            if rule.min_score >= ceiling {
                return Err(ConfigError::ValidationError(format!(
                    "Band thresholds must be strictly descending, {} is {}",
                    band.name(),
                    rule.min_score
                )));
            }
            ceiling = rule.min_score;
        }

        for band in RewardBand::ALL {
            let reward = self.bands.reward(band);
            if !(0.0..=1.0).contains(&reward) {
                return Err(ConfigError::ValidationError(format!(
                    "Reward for {} must be in [0, 1], got {}",
                    band.name(),
                    reward
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RewardConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_band_classification_boundaries() {
        let bands = BandTable::default();
        assert_eq!(bands.classify(0.90), RewardBand::Excellent);
        assert_eq!(bands.classify(0.8999), RewardBand::Good);
        assert_eq!(bands.classify(0.75), RewardBand::Good);
        assert_eq!(bands.classify(0.60), RewardBand::Fair);
        assert_eq!(bands.classify(0.40), RewardBand::Poor);
        assert_eq!(bands.classify(0.39), RewardBand::Worst);
        assert_eq!(bands.reward(RewardBand::Good), 0.4);
    }

    #[test]
    fn test_partial_yaml_override() {
        let yaml = r#"
noise_amplitude: 0.0
bands:
  good:
    min_score: 0.75
    reward: 0.5
"#;

        let config = RewardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.noise_amplitude, 0.0);
        assert_eq!(config.bands.good.reward, 0.5);
        assert_eq!(config.bands.excellent.reward, 1.0);
        assert_eq!(config.weights, ComponentWeights::default());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let json = r#"{"weights": {"structure": 0.5}}"#;
        let result = RewardConfig::from_json(json);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_thresholds_must_descend() {
        let yaml = r#"
bands:
  fair:
    min_score: 0.8
    reward: 0.3
"#;
        let result = RewardConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_noise_amplitude_bounds() {
        let result = RewardConfig::from_yaml("noise_amplitude: 0.7");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
