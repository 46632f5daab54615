//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::error::IdempotencyError;
use quill_core::ports::{ArticleRepository, Clock, IdempotencyStore, SystemClock};
use quill_core::service::{ArticleMutationService, IdempotencyConfig};
use quill_infra::{InMemoryArticleRepository, InMemoryIdempotencyStore};

#[cfg(feature = "postgres")]
use quill_infra::PostgresArticleRepository;
#[cfg(feature = "redis")]
use quill_infra::RedisIdempotencyStore;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub articles: Arc<ArticleMutationService>,
    /// Article storage backend name, for health reporting.
    pub storage: &'static str,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// Fails when Redis is configured but unreachable, unless
    /// `REDIS_FALLBACK_TO_MEMORY` opted in to a process-local store.
    pub async fn new(config: &AppConfig) -> Result<Self, IdempotencyError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (repo, storage) = build_repository(config).await;
        let store = build_idempotency_store(config, clock.clone()).await?;

        tracing::info!(
            storage,
            idempotency = store.backend(),
            "Application state initialized"
        );

        Ok(Self::with_adapters(
            repo,
            store,
            clock,
            config.idempotency.clone(),
            storage,
        ))
    }

    pub fn with_adapters(
        repo: Arc<dyn ArticleRepository>,
        store: Arc<dyn IdempotencyStore>,
        clock: Arc<dyn Clock>,
        idempotency: IdempotencyConfig,
        storage: &'static str,
    ) -> Self {
        Self {
            articles: Arc::new(ArticleMutationService::new(repo, store, clock, idempotency)),
            storage,
        }
    }
}

#[cfg(feature = "postgres")]
async fn build_repository(config: &AppConfig) -> (Arc<dyn ArticleRepository>, &'static str) {
    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return (Arc::new(InMemoryArticleRepository::new()), "memory");
    };

    match quill_infra::database::connect(db_config).await {
        Ok(conn) => (Arc::new(PostgresArticleRepository::new(conn)), "postgres"),
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            (Arc::new(InMemoryArticleRepository::new()), "memory")
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_repository(_config: &AppConfig) -> (Arc<dyn ArticleRepository>, &'static str) {
    tracing::info!("Running without postgres feature - using in-memory repository");
    (Arc::new(InMemoryArticleRepository::new()), "memory")
}

#[cfg(feature = "redis")]
async fn build_idempotency_store(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn IdempotencyStore>, IdempotencyError> {
    let Some(redis_config) = config.redis.clone() else {
        tracing::warn!(
            "REDIS_URL not set. Idempotency keys are process-local and do not protect multi-instance deployments."
        );
        return Ok(Arc::new(InMemoryIdempotencyStore::with_clock(clock)));
    };

    let fallback = redis_config.fallback_to_memory;
    match RedisIdempotencyStore::new(redis_config).await {
        Ok(store) => Ok(Arc::new(store)),
        Err(e) if fallback => {
            tracing::warn!(
                error = %e,
                "Redis unavailable. Falling back to in-memory idempotency store."
            );
            Ok(Arc::new(InMemoryIdempotencyStore::with_clock(clock)))
        }
        Err(e) => Err(e),
    }
}

#[cfg(not(feature = "redis"))]
async fn build_idempotency_store(
    _config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn IdempotencyStore>, IdempotencyError> {
    tracing::info!("Running without redis feature - using in-memory idempotency store");
    Ok(Arc::new(InMemoryIdempotencyStore::with_clock(clock)))
}
