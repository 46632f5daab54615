//! Idempotency key extractor.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};

use crate::middleware::error::AppError;

/// Header carrying the client's idempotency key.
pub static IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

/// The `X-Idempotency-Key` header, if the client sent one.
///
/// Format checks happen in the service, which also generates a key when
/// this is absent.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKey(pub Option<String>);

impl IdempotencyKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequest for IdempotencyKey {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let key = match req.headers().get(IDEMPOTENCY_KEY_HEADER) {
            None => None,
            Some(value) => match value.to_str() {
                Ok(s) => Some(s.trim().to_string()),
                Err(_) => {
                    return ready(Err(AppError::BadRequest(format!(
                        "{IDEMPOTENCY_KEY_HEADER} must be visible ASCII"
                    ))));
                }
            },
        };

        if let Some(k) = &key {
            tracing::debug!(idempotency_key = %k, "Idempotency key supplied");
        }

        ready(Ok(IdempotencyKey(key)))
    }
}
