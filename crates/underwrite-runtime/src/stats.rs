//! Scoring statistics.
//!
//! Lock-free counters shared by every scoring task. The band histogram shows
//! whether the policy is collapsing onto the majority band.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use underwrite_core::{Evaluation, Outcome, RewardBand};

/// Rewards are summed in millionths to stay in an integer atomic.
const REWARD_SCALE: f64 = 1_000_000.0;

/// Counters for a scoring session.
#[derive(Debug, Default)]
pub struct ScoringStats {
    scored: AtomicU64,
    malformed: AtomicU64,
    gated: AtomicU64,
    bands: [AtomicU64; 5],
    reward_micros: AtomicU64,
}

impl ScoringStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished evaluation.
    pub fn record(&self, evaluation: &Evaluation) {
        self.scored.fetch_add(1, Ordering::Relaxed);
        self.reward_micros.fetch_add(
            (evaluation.reward * REWARD_SCALE).round() as u64,
            Ordering::Relaxed,
        );

        match &evaluation.assessment.outcome {
            Outcome::Malformed { .. } => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Gated { .. } => {
                self.gated.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Banded { band } => {
                self.bands[band.index()].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn scored(&self) -> u64 {
        self.scored.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let scored = self.scored();
        let bands: BTreeMap<RewardBand, u64> = RewardBand::ALL
            .iter()
            .map(|band| (*band, self.bands[band.index()].load(Ordering::Relaxed)))
            .collect();
        let banded: u64 = bands.values().sum();

        let band_fractions = bands
            .iter()
            .map(|(band, count)| {
                let fraction = if banded == 0 {
                    0.0
                } else {
                    *count as f64 / banded as f64
                };
                (*band, fraction)
            })
            .collect();

        let mean_reward = if scored == 0 {
            0.0
        } else {
            self.reward_micros.load(Ordering::Relaxed) as f64 / REWARD_SCALE / scored as f64
        };

        StatsSnapshot {
            scored,
            malformed: self.malformed.load(Ordering::Relaxed),
            gated: self.gated.load(Ordering::Relaxed),
            bands,
            band_fractions,
            mean_reward,
            taken_at: Utc::now(),
        }
    }

    /// Reset every counter.
    pub fn reset(&self) {
        self.scored.store(0, Ordering::Relaxed);
        self.malformed.store(0, Ordering::Relaxed);
        self.gated.store(0, Ordering::Relaxed);
        self.reward_micros.store(0, Ordering::Relaxed);
        for band in &self.bands {
            band.store(0, Ordering::Relaxed);
        }
    }
}

/// Serializable view of [`ScoringStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub scored: u64,
    pub malformed: u64,
    pub gated: u64,

    /// Banded evaluations per band
    pub bands: BTreeMap<RewardBand, u64>,

    /// Share of banded evaluations per band
    pub band_fractions: BTreeMap<RewardBand, f64>,

    pub mean_reward: f64,

    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use underwrite_core::ScoringEngine;

    #[test]
    fn test_counts_by_outcome() {
        let engine = ScoringEngine::default();
        let stats = ScoringStats::new();

        stats.record(&engine.evaluate(&"not json".into()));
        stats.record(&engine.evaluate(&json!({"decision": "DENIED"}).into()));
        stats.record(&engine.evaluate(&json!({
            "trajectory_id": "t",
            "decision": "DENIED",
            "agent_outputs": {"loan_officer": {}, "credit_analyst": {}, "risk_manager": {}}
        }).into()));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.scored, 3);
        assert_eq!(snapshot.malformed, 1);
        assert_eq!(snapshot.gated, 1);
        assert_eq!(snapshot.bands.values().sum::<u64>(), 1);
        assert_eq!(snapshot.bands[&RewardBand::Worst], 1);
        assert_eq!(snapshot.band_fractions[&RewardBand::Worst], 1.0);
        assert!(snapshot.mean_reward < 0.1);
    }

    #[test]
    fn test_reset() {
        let stats = ScoringStats::new();
        stats.record(&ScoringEngine::default().evaluate(&"{}".into()));
        stats.reset();
        assert_eq!(stats.snapshot().scored, 0);
        assert_eq!(stats.snapshot().mean_reward, 0.0);
    }
}
