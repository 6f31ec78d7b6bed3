use std::sync::Arc;
use std::time::Instant;

use nutrirec_core::{
    filter_candidates, nearest_neighbors, Dataset, Ranking, RecError, Recommendation,
    RecommendationRequest, Result,
};
use tracing::debug;

use crate::assemble::assemble_recipes;
use crate::config::EngineConfig;
use crate::store::DatasetStore;

/// Query entry point. Holds the loaded dataset; share it behind an `Arc`
/// across request handlers. Every query is read-only.
#[derive(Debug)]
pub struct Recommender {
    store: DatasetStore,
    dataset: Arc<Dataset>,
    default_k: usize,
    max_k: usize,
}

impl Recommender {
    /// Loads the snapshot eagerly so the first query does not pay for it.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let store = DatasetStore::from_config(config);
        Self::with_limits(store, config.default_k, config.max_k)
    }

    pub fn new(store: DatasetStore) -> Result<Self> {
        let defaults = EngineConfig::default();
        Self::with_limits(store, defaults.default_k, defaults.max_k)
    }

    pub fn with_limits(store: DatasetStore, default_k: usize, max_k: usize) -> Result<Self> {
        let dataset = store.load()?;
        Ok(Self {
            store,
            dataset,
            default_k,
            max_k,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Neighbor count used by front ends when a caller does not pick one.
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    pub fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendation> {
        if request.k() > self.max_k {
            return Err(RecError::invalid_request(format!(
                "k = {} exceeds the maximum of {}",
                request.k(),
                self.max_k
            )));
        }
        let started = Instant::now();
        let candidates = filter_candidates(
            &self.dataset,
            request.excluded_ingredients(),
            request.food_type(),
        );
        let outcome = match nearest_neighbors(
            &self.dataset,
            &candidates,
            request.target(),
            request.k(),
        ) {
            Ranking::InsufficientCandidates {
                requested,
                available,
            } => Recommendation::InsufficientCandidates {
                requested,
                available,
            },
            Ranking::Ranked(neighbors) => Recommendation::Matches {
                recipes: assemble_recipes(
                    &self.store,
                    &self.dataset,
                    &neighbors,
                    request.return_distance(),
                ),
            },
        };
        debug!(
            candidates = candidates.len(),
            k = request.k(),
            matched = ?outcome.recipes().map(|r| r.len()),
            elapsed_us = started.elapsed().as_micros() as u64,
            "recommendation served"
        );
        Ok(outcome)
    }
}
