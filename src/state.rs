use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::models::ab_test::AbTest;

/// Cached active A/B test per location, with the time it was fetched.
#[derive(Debug, Clone)]
pub struct CachedAbTest {
    pub test: AbTest,
    pub fetched_at: Instant,
}

pub type AbTestCache = Arc<RwLock<HashMap<String, CachedAbTest>>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub ab_cache: AbTestCache,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config,
            ab_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AbTestCache {
    fn from_ref(state: &AppState) -> Self {
        state.ab_cache.clone()
    }
}
