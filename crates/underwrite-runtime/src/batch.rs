//! Concurrent batch scoring.
//!
//! Each response is assessed on the tokio blocking pool; at most
//! `concurrency` assessments run at once and results come back in input
//! order. Noise is drawn by whichever worker finalizes the result, from its
//! own thread-local generator.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use underwrite_core::{Assessment, Evaluation, Response, ScoreAggregator, ScoringEngine};

use crate::cache::{CacheKey, EvaluationCache};
use crate::config::RuntimeConfig;
use crate::stats::ScoringStats;
use crate::RuntimeError;

/// Scores batches of responses with the rule-based engine.
pub struct BatchScorer {
    engine: Arc<ScoringEngine>,
    concurrency: usize,
    cache: Option<Arc<EvaluationCache>>,
    stats: Arc<ScoringStats>,
}

impl BatchScorer {
    /// Create a scorer without a cache.
    pub fn new(engine: Arc<ScoringEngine>, concurrency: usize) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
            cache: None,
            stats: Arc::new(ScoringStats::new()),
        }
    }

    /// Build a scorer from a runtime config, loading its calibration.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = Arc::new(ScoringEngine::new(config.reward_config()?));
        let scorer = Self::new(engine, config.concurrency);

        Ok(if config.cache.enabled {
            scorer.with_cache(Arc::new(EvaluationCache::from_config(&config.cache)))
        } else {
            scorer
        })
    }

    pub fn with_cache(mut self, cache: Arc<EvaluationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn stats(&self) -> &ScoringStats {
        &self.stats
    }

    pub fn cache(&self) -> Option<&EvaluationCache> {
        self.cache.as_deref()
    }

    /// Score a batch, preserving input order.
    pub async fn score_batch(&self, responses: Vec<Response>) -> Vec<Evaluation> {
        let batch_size = responses.len();
        let started = Instant::now();
        tracing::info!(batch_size, concurrency = self.concurrency, "Scoring batch");

        let evaluations: Vec<Evaluation> = stream::iter(responses)
            .map(|response| self.score_one(response))
            .buffered(self.concurrency)
            .collect()
            .await;

        tracing::info!(
            batch_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch scored"
        );
        if let Some(cache) = &self.cache {
            tracing::debug!(
                hits = cache.hits(),
                misses = cache.misses(),
                entries = cache.entry_count(),
                "Cache statistics"
            );
        }

        evaluations
    }

    /// Score a single response.
    pub async fn score_one(&self, response: Response) -> Evaluation {
        let assessment = self.assessment_for(response).await;
        let evaluation = self
            .engine
            .finalize((*assessment).clone(), &mut rand::thread_rng());
        self.stats.record(&evaluation);
        evaluation
    }

    async fn assessment_for(&self, response: Response) -> Arc<Assessment> {
        let key = CacheKey::new(&response);
        if let Some(cache) = &self.cache {
            if let Some(assessment) = cache.get(&key).await {
                return assessment;
            }
        }

        let engine = Arc::clone(&self.engine);
        let assessment = match tokio::task::spawn_blocking(move || engine.assess(&response)).await {
            Ok(assessment) => Arc::new(assessment),
            Err(err) => {
                tracing::warn!(error = %err, "Scoring task failed, reward is 0.0");
                // Not cached: a retry may succeed
                return Arc::new(
                    ScoreAggregator::new(self.engine.config())
                        .malformed(format!("scoring task failed: {}", err)),
                );
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::clone(&assessment)).await;
        }
        assessment
    }
}
