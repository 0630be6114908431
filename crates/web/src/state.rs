use std::sync::Arc;

use axum::extract::FromRef;
use storage::Database;

use crate::config::RateLimits;
use crate::middleware::rate_limit::{InMemoryRateLimitStore, RateLimitStore};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub limiter: Arc<dyn RateLimitStore>,
    pub rate_limits: RateLimits,
}

impl AppState {
    pub fn new(db: Database, rate_limits: RateLimits) -> Self {
        Self::with_limiter(db, rate_limits, Arc::new(InMemoryRateLimitStore::default()))
    }

    pub fn with_limiter(
        db: Database,
        rate_limits: RateLimits,
        limiter: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            db,
            limiter,
            rate_limits,
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
