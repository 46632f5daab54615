//! # Quill Core
//!
//! The domain layer of the Quill article service: entities, the content
//! sanitizer, the ports and the mutation-safety services built on them.
//! No infrastructure dependencies live here.

pub mod domain;
pub mod error;
pub mod ports;
pub mod sanitize;
pub mod service;

pub use error::DomainError;
