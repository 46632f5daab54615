use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of atomically claiming an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The caller now owns the key and must `commit` or `release` it,
    /// presenting `token`.
    Fresh { token: Uuid },
    /// Someone already claimed the key. `result_id` is `None` while the
    /// first request is still in flight.
    Duplicate { result_id: Option<Uuid> },
}

/// State of a stored idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    /// Claimed by the request holding `token`.
    Pending { token: Uuid },
    Completed(Uuid),
}

/// Transient key -> result mapping; never domain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub state: RecordState,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn pending(key: impl Into<String>, token: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            state: RecordState::Pending { token },
            expires_at,
        }
    }

    pub fn completed(key: impl Into<String>, result_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            state: RecordState::Completed(result_id),
            expires_at,
        }
    }

    pub fn result_id(&self) -> Option<Uuid> {
        match self.state {
            RecordState::Completed(id) => Some(id),
            RecordState::Pending { .. } => None,
        }
    }

    /// Whether this record is still the uncommitted claim made with `token`.
    pub fn is_claimed_by(&self, token: Uuid) -> bool {
        self.state == RecordState::Pending { token }
    }

    /// Lazy expiry: a record is forgotten once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn as_reservation(&self) -> Reservation {
        Reservation::Duplicate {
            result_id: self.result_id(),
        }
    }
}
