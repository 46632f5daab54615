//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Domain errors - business logic failures surfaced to callers unchanged.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate in-flight idempotency key, or an optimistic-lock mismatch.
    /// Edit conflicts carry the version currently persisted.
    #[error("Conflict: {reason}")]
    Conflict {
        reason: String,
        current_version: Option<i64>,
    },

    #[error("Backing store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn article_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity_type: "Article",
            id,
        }
    }

    pub fn stale_version(current_version: i64) -> Self {
        Self::Conflict {
            reason: format!(
                "Article was modified concurrently (current version {current_version}); re-fetch and retry"
            ),
            current_version: Some(current_version),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Connection(msg) | RepoError::Query(msg) => Self::StoreUnavailable(msg),
            RepoError::NotFound => Self::Internal("Repository reported a missing row".to_string()),
            RepoError::Constraint(msg) => Self::Internal(format!("Constraint violation: {msg}")),
        }
    }
}

/// Idempotency store errors.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("Idempotency store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt idempotency record for key {key}: {detail}")]
    Corrupt { key: String, detail: String },
}

impl From<IdempotencyError> for DomainError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::Unavailable(msg) => Self::StoreUnavailable(msg),
            corrupt @ IdempotencyError::Corrupt { .. } => Self::Internal(corrupt.to_string()),
        }
    }
}
