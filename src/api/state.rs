use std::sync::Arc;

use crate::config::Config;
use crate::services::{PostStore, RecommendationBuilder, SeededRandom};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub recommender: RecommendationBuilder,
    pub settings: RecommendationSettings,
}

/// Request-independent knobs for the recommendation endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSettings {
    pub default_count: usize,
    pub max_count: usize,
    pub rng_seed: Option<u64>,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            default_count: 30,
            max_count: 100,
            rng_seed: None,
        }
    }
}

impl From<&Config> for RecommendationSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_count: config.default_post_count,
            max_count: config.max_post_count,
            rng_seed: config.rng_seed,
        }
    }
}

impl RecommendationSettings {
    /// Turns the optional `count` query parameter into a merge limit.
    ///
    /// Missing means the default, non-positive means an empty feed, and
    /// anything above the maximum is clamped.
    pub fn resolve_count(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_count,
            Some(n) if n <= 0 => 0,
            Some(n) => usize::try_from(n).map_or(self.max_count, |n| n.min(self.max_count)),
        }
    }

    /// Random source for one request
    pub fn random_source(&self) -> SeededRandom {
        SeededRandom::for_request(self.rng_seed)
    }
}

impl AppState {
    /// Creates the application state around a post store
    pub fn new(store: Arc<dyn PostStore>, settings: RecommendationSettings) -> Self {
        Self {
            recommender: RecommendationBuilder::new(store.clone()),
            store,
            settings,
        }
    }
}
