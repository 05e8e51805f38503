//! Aggregator: combines component findings into a banded reward.
//!
//! The aggregation rules:
//! 1. Malformed input → reward exactly 0.0, no noise
//! 2. Structure below the gate → reward is the weighted structure term, no noise
//! 3. Otherwise → weighted score mapped to a band, plus tie-breaking noise
//!
//! Everything up to the band reward is deterministic; noise is drawn
//! separately in [`ScoreAggregator::jitter`] from a caller-supplied generator.

use rand::Rng;

use crate::config::RewardConfig;
use crate::types::{Assessment, Component, ComponentFinding, Outcome, ScoreComponents};

/// Combines findings under a calibration.
pub struct ScoreAggregator<'a> {
    config: &'a RewardConfig,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(config: &'a RewardConfig) -> Self {
        Self { config }
    }

    /// Weighted sum of the component scores.
    pub fn weighted_score(&self, components: &ScoreComponents) -> f64 {
        Component::ALL
            .iter()
            .map(|c| self.config.weights.get(*c) * components.get(*c))
            .sum()
    }

    /// Aggregate a full set of findings into a banded assessment.
    pub fn aggregate(&self, findings: Vec<ComponentFinding>) -> Assessment {
        let components = Self::collect_components(&findings);
        let weighted_score = self.weighted_score(&components);
        let band = self.config.bands.classify(weighted_score);
        let base_reward = self.config.bands.reward(band);

        tracing::debug!(
            raw = weighted_score,
            band = ?band,
            base_reward,
            "Aggregated component scores"
        );

        Assessment {
            outcome: Outcome::Banded { band },
            components,
            findings,
            weighted_score,
            base_reward,
        }
    }

    /// Early exit after a failed structure gate.
    ///
    /// Only the weighted structure term counts; the other components stay zero.
    pub fn gated(&self, structure: ComponentFinding) -> Assessment {
        let mut components = ScoreComponents::default();
        components.set(Component::Structure, structure.score);
        let weighted_score = self.weighted_score(&components);

        tracing::debug!(
            structure = components.structure,
            reward = weighted_score,
            "Structure below gate, skipping remaining components"
        );

        Assessment {
            outcome: Outcome::Gated {
                structure: components.structure,
            },
            components,
            findings: vec![structure],
            weighted_score,
            base_reward: weighted_score,
        }
    }

    /// Assessment for input that never parsed into an envelope.
    pub fn malformed(&self, reason: impl Into<String>) -> Assessment {
        Assessment {
            outcome: Outcome::Malformed {
                reason: reason.into(),
            },
            components: ScoreComponents::default(),
            findings: Vec::new(),
            weighted_score: 0.0,
            base_reward: 0.0,
        }
    }

    /// Whether a structure score passes the gate.
    pub fn passes_gate(&self, structure: f64) -> bool {
        structure >= self.config.structure_gate
    }

    /// Final reward: the base reward plus uniform noise, clamped to [0, 1].
    ///
    /// Only banded assessments receive noise.
    pub fn jitter<R: Rng>(&self, assessment: &Assessment, rng: &mut R) -> f64 {
        let amplitude = self.config.noise_amplitude;
        let reward = match assessment.outcome {
            Outcome::Banded { .. } if amplitude > 0.0 => {
                assessment.base_reward + rng.gen_range(-amplitude..=amplitude)
            }
            _ => assessment.base_reward,
        };
        reward.clamp(0.0, 1.0)
    }

    fn collect_components(findings: &[ComponentFinding]) -> ScoreComponents {
        let mut components = ScoreComponents::default();
        for finding in findings {
            components.set(finding.component, finding.score);
        }
        components
    }
}
