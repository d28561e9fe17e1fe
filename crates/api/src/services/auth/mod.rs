//! Authentication service.
//!
//! Password accounts with emailed one-time secrets: a 4-digit OTP for email
//! verification and a random token for password reset links. Passwords and
//! both secrets are stored only as Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;

use shopfront_core::{Email, UserId};

use crate::config::TokenConfig;
use crate::db::tokens::{StoredToken, TokenKind};
use crate::db::{RepositoryError, TokenRepository, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Wrong guesses allowed against one OTP or reset token before it is discarded.
pub const MAX_SECRET_ATTEMPTS: i32 = 5;

/// Random bytes in a password reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Authentication service.
///
/// Handles registration, login, OTP email verification and password reset.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: TokenRepository<'a>,
    ttl: TokenConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, ttl: TokenConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: TokenRepository::new(pool),
            ttl,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new, unverified user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Email Verification
    // =========================================================================

    /// Issue a fresh OTP for a user, replacing earlier ones.
    ///
    /// Returns the user (for addressing the email) and the plaintext code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn issue_otp(&self, user_id: UserId) -> Result<(User, String), AuthError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let code = generate_otp();
        self.store_secret(TokenKind::Otp, user_id, &code).await?;

        Ok((user, code))
    }

    /// Check an OTP and mark the user verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` or `AuthError::TokenNotFound` when
    /// there is nothing to verify against, `AuthError::TokenExpired` or
    /// `AuthError::TokenInvalid` when the code is stale or wrong, and
    /// `AuthError::TooManyAttempts` once it has been guessed wrong too often.
    pub async fn verify_otp(&self, user_id: UserId, code: &str) -> Result<User, AuthError> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        self.consume_secret(TokenKind::Otp, user_id, code.trim())
            .await?;

        Ok(self.users.mark_verified(user_id).await?)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a password reset token for the account with this email.
    ///
    /// Returns `None` when no account matches, so callers can answer
    /// identically either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn issue_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        self.store_secret(TokenKind::PasswordReset, user.id, &token)
            .await?;

        Ok(Some((user, token)))
    }

    /// Set a new password using an emailed reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::TokenNotFound`, `AuthError::TokenExpired`,
    /// `AuthError::TokenInvalid` or `AuthError::TooManyAttempts` if the token
    /// cannot be used.
    pub async fn reset_password(
        &self,
        user_id: UserId,
        token: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        validate_password(password)?;
        self.consume_secret(TokenKind::PasswordReset, user_id, token)
            .await?;

        let password_hash = hash_password(password)?;
        self.users
            .update_password(user_id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    async fn store_secret(
        &self,
        kind: TokenKind,
        user_id: UserId,
        secret: &str,
    ) -> Result<(), AuthError> {
        let ttl = match kind {
            TokenKind::Otp => self.ttl.otp_ttl,
            TokenKind::PasswordReset => self.ttl.password_reset_ttl,
        };
        // Lifetimes beyond chrono's range are capped at a year.
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let hash = hash_password(secret)?;

        self.tokens
            .replace(kind, user_id, &hash, Utc::now() + ttl)
            .await?;
        Ok(())
    }

    /// Check a secret against the latest stored hash and delete it once used.
    /// Expired secrets are deleted too.
    async fn consume_secret(
        &self,
        kind: TokenKind,
        user_id: UserId,
        secret: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .tokens
            .latest(kind, user_id)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if let Err(err) = check_secret(&stored, secret) {
            tracing::debug!(user_id = %user_id, ?kind, error = %err, "One-time secret rejected");
            let err = match err {
                AuthError::TokenInvalid => {
                    let failed = self.tokens.record_failure(kind, stored.id).await?;
                    if failed.is_some_and(attempts_exhausted) {
                        tracing::warn!(
                            user_id = %user_id,
                            ?kind,
                            "One-time secret discarded after repeated failures"
                        );
                        AuthError::TooManyAttempts
                    } else {
                        AuthError::TokenInvalid
                    }
                }
                other => other,
            };
            if matches!(err, AuthError::TokenExpired | AuthError::TooManyAttempts) {
                self.tokens.delete_all(kind, user_id).await?;
            }
            return Err(err);
        }

        self.tokens.delete_all(kind, user_id).await?;
        Ok(())
    }
}

fn check_secret(stored: &StoredToken, secret: &str) -> Result<(), AuthError> {
    if stored.is_expired(Utc::now()) {
        return Err(AuthError::TokenExpired);
    }
    if attempts_exhausted(stored.failed_attempts) {
        return Err(AuthError::TooManyAttempts);
    }
    verify_password(secret, &stored.hash).map_err(|_| AuthError::TokenInvalid)
}

const fn attempts_exhausted(failed_attempts: i32) -> bool {
    failed_attempts >= MAX_SECRET_ATTEMPTS
}

/// Generate a 4-digit OTP.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(1_000..10_000);
    code.to_string()
}

/// Generate a URL-safe password reset token.
#[must_use]
pub fn generate_reset_token() -> String {
    let bytes: [u8; RESET_TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password (or one-time secret) using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
