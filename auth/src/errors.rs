//! Error kinds returned by the auth core.
//!
//! Business outcomes (`EmailTaken`, `InvalidCredentials`, `UserNotFound`,
//! token failures) are distinct variants so callers can map them to
//! responses. Infrastructure failures collapse into `AuthError::Internal`,
//! whose message is fixed and reveals nothing.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,
    /// Same variant for an unknown email and a wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("password exceeds {max} bytes")]
    PasswordTooLong { max: usize },
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Short machine-readable code for logs and domain events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailTaken => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserNotFound => "user_not_found",
            Self::PasswordTooLong { .. } => "password_too_long",
            Self::Token(TokenError::Expired) => "token_expired",
            Self::Token(_) => "token_invalid",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashingError {
    /// The algorithm would silently ignore bytes past `max`.
    #[error("password exceeds {max} bytes")]
    TooLong { max: usize },
    #[error("password hashing failed: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Duplicate,
    #[error("user not found")]
    NotFound,
    #[error("user store failure: {0}")]
    Backend(#[from] anyhow::Error),
}
