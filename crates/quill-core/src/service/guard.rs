//! Idempotency guard - at most one successful creation per key.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::{ArticleFields, Reservation};
use crate::error::{DomainError, IdempotencyError};
use crate::ports::IdempotencyStore;

pub const MAX_KEY_LEN: usize = 128;

/// How the key for a create request is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Client-supplied key, or a fresh server-generated one when absent.
    #[default]
    RequestKey,
    /// Client key when present, otherwise a hash of author, title and content.
    /// Weaker: two legitimately identical articles collapse into one.
    ContentFingerprint,
}

impl KeyPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "request" | "request_key" => Some(Self::RequestKey),
            "fingerprint" | "content_fingerprint" => Some(Self::ContentFingerprint),
            _ => None,
        }
    }
}

/// Idempotency guard configuration.
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// How long a committed result is replayed.
    pub ttl: Duration,
    /// How long an uncommitted claim blocks the key.
    pub lease: Duration,
    /// Namespace prepended to every key.
    pub key_prefix: String,
    /// How long a duplicate waits for an in-flight original to finish.
    pub in_flight_wait: Duration,
    /// Delay between polls while waiting.
    pub poll_interval: Duration,
    pub policy: KeyPolicy,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            lease: Duration::from_secs(5 * 60),
            key_prefix: "idempotency".to_string(),
            in_flight_wait: Duration::from_secs(2),
            poll_interval: Duration::from_millis(25),
            policy: KeyPolicy::RequestKey,
        }
    }
}

/// Result of claiming a key for creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller owns the key and must commit or release it with `token`.
    Fresh { token: Uuid },
    /// A previous request with this key already created `result_id`.
    Completed(Uuid),
}

/// Wraps an [`IdempotencyStore`] with key derivation and the retry policy.
pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyStore>,
    config: IdempotencyConfig,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyStore>, config: IdempotencyConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &IdempotencyConfig {
        &self.config
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Derive the namespaced store key for a create request.
    ///
    /// An empty client key counts as absent.
    pub fn scoped_key(
        &self,
        author_id: Uuid,
        client_key: Option<&str>,
        fields: &ArticleFields,
    ) -> Result<String, DomainError> {
        let key = match client_key.filter(|k| !k.is_empty()) {
            Some(k) => {
                validate_client_key(k)?;
                k.to_string()
            }
            None => match self.config.policy {
                KeyPolicy::RequestKey => Uuid::new_v4().to_string(),
                KeyPolicy::ContentFingerprint => fingerprint(author_id, fields),
            },
        };

        Ok(format!("{}:{}:{}", self.config.key_prefix, author_id, key))
    }

    /// Claim `key`, waiting briefly for an in-flight original to finish.
    ///
    /// Fails closed: a store error is never treated as a fresh claim.
    pub async fn claim(&self, key: &str) -> Result<Claim, DomainError> {
        match self.store.reserve(key, self.config.lease).await? {
            Reservation::Fresh { token } => Ok(Claim::Fresh { token }),
            Reservation::Duplicate {
                result_id: Some(id),
            } => Ok(Claim::Completed(id)),
            Reservation::Duplicate { result_id: None } => self.wait_for_original(key).await,
        }
    }

    async fn wait_for_original(&self, key: &str) -> Result<Claim, DomainError> {
        let deadline = Instant::now() + self.config.in_flight_wait;
        tracing::debug!(idempotency_key = %key, "Key in flight, waiting for original request");

        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            if let Some(id) = self.store.lookup(key).await? {
                return Ok(Claim::Completed(id));
            }
            // The original may have released the key after a failed insert.
            match self.store.reserve(key, self.config.lease).await? {
                Reservation::Fresh { token } => return Ok(Claim::Fresh { token }),
                Reservation::Duplicate {
                    result_id: Some(id),
                } => return Ok(Claim::Completed(id)),
                Reservation::Duplicate { result_id: None } => {}
            }

            if Instant::now() >= deadline {
                tracing::warn!(idempotency_key = %key, "Idempotency key still in flight");
                return Err(DomainError::Conflict {
                    reason: "A request with this idempotency key is still being processed"
                        .to_string(),
                    current_version: None,
                });
            }
        }
    }

    /// Returns `false` when the claim behind `token` was lost before commit.
    pub async fn commit(
        &self,
        key: &str,
        token: Uuid,
        result_id: Uuid,
    ) -> Result<bool, IdempotencyError> {
        self.store.commit(key, token, result_id, self.config.ttl).await
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<Uuid>, IdempotencyError> {
        self.store.lookup(key).await
    }

    pub async fn release(&self, key: &str, token: Uuid) -> Result<bool, IdempotencyError> {
        self.store.release(key, token).await
    }

    pub async fn purge_expired(&self) -> Result<usize, IdempotencyError> {
        self.store.purge_expired().await
    }
}

fn validate_client_key(key: &str) -> Result<(), DomainError> {
    let valid_len = key.len() <= MAX_KEY_LEN;
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));

    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "Idempotency key must be 1-{MAX_KEY_LEN} characters of [A-Za-z0-9_.:-]"
        )))
    }
}

fn fingerprint(author_id: Uuid, fields: &ArticleFields) -> String {
    let mut hasher = Sha256::new();
    hasher.update(author_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(fields.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(fields.content.as_bytes());
    format!("fp-{:x}", hasher.finalize())
}
