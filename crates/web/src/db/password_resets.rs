//! Password reset token storage.
//!
//! Only the SHA-256 digest of a token is stored; the raw token exists
//! solely in the emailed link.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dar_core::UserId;

use super::RepositoryError;

/// Repository for password reset tokens.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    /// Create a new password reset repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a token digest for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO dar.password_reset_token (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Mark a token as used and store the user's new password hash.
    ///
    /// Both writes share one transaction; the token stays unused if the
    /// password write fails. Returns `None` when the token is unknown,
    /// expired, or already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either write fails.
    pub async fn consume_with_password(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(user_id) = sqlx::query_scalar::<_, UserId>(
            r"
            UPDATE dar.password_reset_token
            SET used_at = NOW()
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            RETURNING user_id
            ",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r"
            INSERT INTO dar.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(user_id))
    }

    /// Check whether a token could still be consumed, without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_valid(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM dar.password_reset_token
                WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            )
            ",
        )
        .bind(token_hash)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
