//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! article storage, idempotency stores and token verification.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL article storage via SeaORM
//! - `auth` - JWT token service
//! - `redis` - Redis idempotency store shared across instances

pub mod database;
pub mod idempotency;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use database::InMemoryArticleRepository;
pub use idempotency::InMemoryIdempotencyStore;

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresArticleRepository};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use idempotency::{RedisConfig, RedisIdempotencyStore};
