//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use quill_core::service::{IdempotencyConfig, KeyPolicy};

#[cfg(feature = "postgres")]
use quill_infra::DatabaseConfig;
#[cfg(feature = "redis")]
use quill_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub idempotency: IdempotencyConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            idempotency: idempotency_from_env(),
        }
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

/// Idempotency settings. Unset or unparsable values keep their defaults.
fn idempotency_from_env() -> IdempotencyConfig {
    let defaults = IdempotencyConfig::default();

    let policy = match env::var("IDEMPOTENCY_KEY_POLICY") {
        Ok(value) => KeyPolicy::parse(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "Unknown IDEMPOTENCY_KEY_POLICY, using request keys");
            KeyPolicy::RequestKey
        }),
        Err(_) => defaults.policy,
    };

    IdempotencyConfig {
        ttl: secs_var("IDEMPOTENCY_TTL_SECS").unwrap_or(defaults.ttl),
        lease: secs_var("IDEMPOTENCY_LEASE_SECS").unwrap_or(defaults.lease),
        key_prefix: env::var("IDEMPOTENCY_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        policy,
        ..defaults
    }
}
