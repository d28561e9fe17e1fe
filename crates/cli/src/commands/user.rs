//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! shopfront-cli user promote -e someone@example.com
//! shopfront-cli user demote -e someone@example.com
//! ```
//!
//! Existing sessions keep their old role until `/auth/check-auth` refreshes
//! them.

use shopfront_api::db::{RepositoryError, UserRepository};
use shopfront_core::{Email, EmailError};
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account with this email.
    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Grant (`true`) or revoke (`false`) admin rights.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such user exists or the
/// database fails.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), UserError> {
    let email = Email::parse(email)?;
    let pool = super::connect().await?;

    let user = UserRepository::new(&pool)
        .set_admin(&email, is_admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(email.to_string()),
            other => UserError::Repository(other),
        })?;

    if is_admin {
        tracing::info!("Promoted {} (ID {}) to admin", user.email, user.id);
    } else {
        tracing::info!("Removed admin rights from {} (ID {})", user.email, user.id);
    }
    Ok(())
}
