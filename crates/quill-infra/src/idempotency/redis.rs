//! Redis idempotency store - shared across instances.
//!
//! Values are `pending:<token>` while a request is in flight and
//! `done:<uuid>` once committed. Expiry is left to Redis `PX` TTLs.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use uuid::Uuid;

use quill_core::domain::{RecordState, Reservation};
use quill_core::error::IdempotencyError;
use quill_core::ports::IdempotencyStore;

const PENDING_PREFIX: &str = "pending:";
const DONE_PREFIX: &str = "done:";

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fall back to the in-memory store if Redis is unavailable.
    /// Off by default: a process-local store cannot deduplicate across
    /// instances.
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: false,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Redis-backed idempotency store.
///
/// Every operation is one command or one Lua script, so `reserve` is an
/// atomic test-and-set across all instances sharing the server.
pub struct RedisIdempotencyStore {
    conn: ConnectionManager,
    reserve_script: Script,
    commit_script: Script,
    release_script: Script,
}

impl RedisIdempotencyStore {
    pub async fn new(config: RedisConfig) -> Result<Self, IdempotencyError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| IdempotencyError::Unavailable(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| IdempotencyError::Unavailable("Connection timed out".to_string()))?
            .map_err(|e| IdempotencyError::Unavailable(e.to_string()))?;

        // Claim the key if absent, otherwise report what is stored.
        let reserve_script = Script::new(
            r#"
            if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2]) then
                return 'fresh'
            end
            return redis.call('GET', KEYS[1])
            "#,
        );

        // Swap the owner's claim for the result; anything else is left as is.
        let commit_script = Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
                return 1
            end
            return 0
            "#,
        );

        // Only the owner's uncommitted claim may be released.
        let release_script = Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            end
            return 0
            "#,
        );

        tracing::info!(url = %config.url, "Connected to Redis idempotency store");

        Ok(Self {
            conn,
            reserve_script,
            commit_script,
            release_script,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, IdempotencyError> {
        Self::new(RedisConfig::from_env()).await
    }
}

fn backend_error(e: redis::RedisError) -> IdempotencyError {
    IdempotencyError::Unavailable(e.to_string())
}

fn pending_value(token: Uuid) -> String {
    format!("{PENDING_PREFIX}{token}")
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Decode a stored value.
fn parse_state(key: &str, value: &str) -> Result<RecordState, IdempotencyError> {
    let state = if let Some(token) = value.strip_prefix(PENDING_PREFIX) {
        Uuid::parse_str(token)
            .ok()
            .map(|token| RecordState::Pending { token })
    } else {
        value
            .strip_prefix(DONE_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .map(RecordState::Completed)
    };
    state.ok_or_else(|| IdempotencyError::Corrupt {
            key: key.to_string(),
            detail: format!("unexpected value '{value}'"),
        })
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn reserve(&self, key: &str, lease: Duration) -> Result<Reservation, IdempotencyError> {
        let mut conn = self.conn.clone();
        let token = Uuid::new_v4();
        let reply: String = self
            .reserve_script
            .key(key)
            .arg(pending_value(token))
            .arg(millis(lease))
            .invoke_async(&mut conn)
            .await
            .map_err(backend_error)?;

        if reply == "fresh" {
            return Ok(Reservation::Fresh { token });
        }
        let result_id = match parse_state(key, &reply)? {
            RecordState::Pending { .. } => None,
            RecordState::Completed(id) => Some(id),
        };
        Ok(Reservation::Duplicate { result_id })
    }

    async fn commit(
        &self,
        key: &str,
        token: Uuid,
        result_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError> {
        let mut conn = self.conn.clone();
        let swapped: i64 = self
            .commit_script
            .key(key)
            .arg(pending_value(token))
            .arg(format!("{DONE_PREFIX}{result_id}"))
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(swapped == 1)
    }

    async fn lookup(&self, key: &str) -> Result<Option<Uuid>, IdempotencyError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(backend_error)?;

        match value {
            Some(v) => match parse_state(key, &v)? {
                RecordState::Completed(id) => Ok(Some(id)),
                RecordState::Pending { .. } => Ok(None),
            },
            None => Ok(None),
        }
    }

    async fn release(&self, key: &str, token: Uuid) -> Result<bool, IdempotencyError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .release_script
            .key(key)
            .arg(pending_value(token))
            .invoke_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(removed == 1)
    }

    async fn purge_expired(&self) -> Result<usize, IdempotencyError> {
        // Redis drops expired keys on its own.
        Ok(0)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
