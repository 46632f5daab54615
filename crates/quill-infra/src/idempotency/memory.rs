//! In-memory idempotency store - single-instance deployments and fallback
//! when Redis is unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{IdempotencyRecord, Reservation};
use quill_core::error::IdempotencyError;
use quill_core::ports::{Clock, IdempotencyStore, SystemClock};

/// Idempotency records in a HashMap behind an async RwLock.
///
/// Each operation runs inside one write-lock critical section, so
/// `reserve` is an atomic test-and-set within this process. It does not
/// protect several instances sharing a database; use the Redis store there.
/// Note: records are lost on process restart.
pub struct InMemoryIdempotencyStore {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, IdempotencyError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| IdempotencyError::Unavailable(format!("TTL out of range: {e}")))?;
        Ok(self.clock.now() + ttl)
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn reserve(&self, key: &str, lease: Duration) -> Result<Reservation, IdempotencyError> {
        let expires_at = self.expiry(lease)?;
        let now = self.clock.now();
        let mut records = self.records.write().await;

        if let Some(record) = records.get(key).filter(|r| !r.is_expired(now)) {
            return Ok(record.as_reservation());
        }

        let token = Uuid::new_v4();
        records.insert(
            key.to_string(),
            IdempotencyRecord::pending(key, token, expires_at),
        );
        Ok(Reservation::Fresh { token })
    }

    async fn commit(
        &self,
        key: &str,
        token: Uuid,
        result_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError> {
        let expires_at = self.expiry(ttl)?;
        let mut records = self.records.write().await;

        // An expired claim may be taken over at any moment; it is no longer ours.
        let now = self.clock.now();
        match records.get_mut(key) {
            Some(record) if record.is_claimed_by(token) && !record.is_expired(now) => {
                *record = IdempotencyRecord::completed(key, result_id, expires_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<Uuid>, IdempotencyError> {
        let now = self.clock.now();
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .filter(|r| !r.is_expired(now))
            .and_then(IdempotencyRecord::result_id))
    }

    async fn release(&self, key: &str, token: Uuid) -> Result<bool, IdempotencyError> {
        let mut records = self.records.write().await;
        if records.get(key).is_some_and(|r| r.is_claimed_by(token)) {
            records.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn purge_expired(&self) -> Result<usize, IdempotencyError> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        Ok(before - records.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
