//! Hashed one-time secrets: email OTPs and password reset tokens.
//!
//! Both tables hold at most one live row per user; issuing a new secret
//! deletes the earlier ones in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use shopfront_core::UserId;

use super::RepositoryError;

/// Which kind of one-time secret a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// 4-digit email verification code.
    Otp,
    /// Password reset link token.
    PasswordReset,
}

impl TokenKind {
    const fn table(self) -> &'static str {
        match self {
            Self::Otp => "shop.otp",
            Self::PasswordReset => "shop.password_reset_token",
        }
    }

    const fn hash_column(self) -> &'static str {
        match self {
            Self::Otp => "code_hash",
            Self::PasswordReset => "token_hash",
        }
    }
}

/// A stored secret hash, its expiry and how often it has been guessed wrong.
#[derive(Debug, Clone, FromRow)]
pub struct StoredToken {
    pub id: i32,
    pub hash: String,
    pub failed_attempts: i32,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Repository for OTP and password reset rows.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new secret hash for a user, removing any earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the user does not exist.
    pub async fn replace(
        &self,
        kind: TokenKind,
        user_id: UserId,
        hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", kind.table()))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "INSERT INTO {} (user_id, {}, expires_at) VALUES ($1, $2, $3)",
            kind.table(),
            kind.hash_column()
        ))
        .bind(user_id)
        .bind(hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "token already exists"))?;

        tx.commit().await?;
        Ok(())
    }

    /// Most recently issued secret for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(
        &self,
        kind: TokenKind,
        user_id: UserId,
    ) -> Result<Option<StoredToken>, RepositoryError> {
        let token = sqlx::query_as::<_, StoredToken>(&format!(
            "SELECT id, {} AS hash, failed_attempts, expires_at FROM {} WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            kind.hash_column(),
            kind.table()
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    /// Count one wrong guess against a stored secret.
    ///
    /// Returns the new number of failed attempts, or `None` if the row is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_failure(
        &self,
        kind: TokenKind,
        id: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(&format!(
            "UPDATE {} SET failed_attempts = failed_attempts + 1 WHERE id = $1 RETURNING failed_attempts",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(attempts)
    }

    /// Delete every secret of this kind for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self, kind: TokenKind, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", kind.table()))
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_token_expiry_boundary() {
        let now = Utc::now();
        let token = StoredToken {
            id: 1,
            hash: String::new(),
            failed_attempts: 0,
            expires_at: now,
        };
        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_kinds_target_distinct_tables() {
        assert_ne!(TokenKind::Otp.table(), TokenKind::PasswordReset.table());
        assert_eq!(TokenKind::Otp.hash_column(), "code_hash");
    }
}
