//! Middleware modules.

pub mod auth;
pub mod error;
pub mod idempotency;
