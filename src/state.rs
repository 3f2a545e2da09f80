use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    /// Keyed by `"{tenant_id}:{user_id}"`; `None` caches a non-membership.
    pub tenant_membership_cache: Cache<String, Option<Value>>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, sqlx::Error> {
        let db_pool = match config.db_url.as_deref() {
            Some(url) => Some(
                PgPoolOptions::new()
                    .max_connections(config.db_pool_max_connections)
                    .min_connections(config.db_pool_min_connections)
                    .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
                    .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
                    .connect_lazy(url)?,
            ),
            None => {
                tracing::warn!("DATABASE_URL is not set, database-backed routes will fail");
                None
            }
        };

        let tenant_membership_cache = Cache::builder()
            .max_capacity(config.tenant_membership_cache_max_entries)
            .time_to_live(Duration::from_secs(
                config.tenant_membership_cache_ttl_seconds,
            ))
            .build();

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            tenant_membership_cache,
        })
    }
}

pub fn db_pool(state: &AppState) -> AppResult<&PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}
