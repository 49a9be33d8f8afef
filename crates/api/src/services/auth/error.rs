//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::kv::KvError;
use crate::services::throttle::ThrottleError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tanam_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// User already exists.
    #[error("email already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Verification code missing, expired, or wrong.
    #[error("invalid or expired verification code")]
    InvalidCode,

    /// Too many verification code guesses for this email.
    #[error("too many verification attempts")]
    TooManyGuesses,

    /// Login throttled or throttle store failure.
    #[error(transparent)]
    Throttle(#[from] ThrottleError),

    /// Key-value store error (verification codes).
    #[error("store error: {0}")]
    Store(#[from] KvError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
