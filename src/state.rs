use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::clock::Clock;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            clock,
            http: reqwest::Client::new(),
        }
    }
}

// Permite extraer State<SqlitePool> directamente en los handlers
impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
