//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    /// Display name missing or blank.
    #[error("name is required")]
    InvalidName,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// No OTP or reset token has been issued.
    #[error("no token issued")]
    TokenNotFound,

    /// The OTP or reset token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// The OTP or reset token does not match.
    #[error("token invalid")]
    TokenInvalid,

    /// Too many wrong guesses; the secret has been discarded.
    #[error("too many attempts")]
    TooManyAttempts,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
