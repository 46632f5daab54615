//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod idempotency;
mod repository;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use idempotency::IdempotencyStore;
pub use repository::{ArticleRepository, BaseRepository};
