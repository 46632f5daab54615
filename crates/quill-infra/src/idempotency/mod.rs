//! Idempotency stores - Redis and in-memory fallback.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemoryIdempotencyStore;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisIdempotencyStore};
