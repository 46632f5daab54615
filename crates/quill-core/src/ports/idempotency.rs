//! Idempotency store port - keyed store backing the creation guard.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Reservation;
use crate::error::IdempotencyError;

/// Keyed store for idempotency records (in-process or shared).
///
/// Every method is a single atomic operation against the backing store.
/// Expired records must behave exactly like absent ones.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically test-and-claim `key`. A fresh claim stays valid for `lease`
    /// unless it is committed or released first, and carries a token that
    /// identifies its owner.
    async fn reserve(&self, key: &str, lease: Duration) -> Result<Reservation, IdempotencyError>;

    /// Record the result of a successful creation, valid for `ttl`.
    ///
    /// Only applies while `key` still holds the claim made with `token`.
    /// Returns `false` when the claim was lost, e.g. its lease ran out and
    /// another request took the key over.
    async fn commit(
        &self,
        key: &str,
        token: Uuid,
        result_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError>;

    /// Fetch the committed result for `key`, if any.
    async fn lookup(&self, key: &str) -> Result<Option<Uuid>, IdempotencyError>;

    /// Drop the uncommitted claim made with `token` so the key becomes
    /// retryable. Committed records and other requests' claims are left
    /// alone; returns whether anything was removed.
    async fn release(&self, key: &str, token: Uuid) -> Result<bool, IdempotencyError>;

    /// Forget expired records. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, IdempotencyError>;

    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;
}
