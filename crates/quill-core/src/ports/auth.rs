//! Identity source ports.

use uuid::Uuid;

/// Author identity carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
}

/// Verifies bearer tokens issued by the identity provider.
pub trait TokenService: Send + Sync {
    /// Issue a token for `user_id`. Used by tooling and tests; sign-in lives
    /// outside this service.
    fn issue_token(&self, user_id: Uuid, username: &str) -> Result<String, AuthError>;

    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,
}
