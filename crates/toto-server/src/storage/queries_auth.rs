//! Admin account and refresh token queries.

use toto_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{Account, Token};

impl Database {
    // =========================================================================
    // Account queries
    // =========================================================================

    pub async fn create_account(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        admin: bool,
    ) -> Result<Account, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, admin, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(admin)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_account(id).await
    }

    pub async fn get_account(&self, id: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {id}")))
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account with email {email}")))
    }

    pub async fn count_admins(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE admin = 1")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Token queries
    // =========================================================================

    /// Store a refresh token hash.
    pub async fn create_token(
        &self,
        id: &str,
        account_id: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<Token, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tokens (id, account_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_token(id).await
    }

    pub async fn get_token(&self, id: &str) -> Result<Token, DatabaseError> {
        sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Token {id}")))
    }

    /// Find a valid (non-revoked, non-expired) token by hash.
    pub async fn get_token_by_hash(&self, token_hash: &str) -> Result<Option<Token>, DatabaseError> {
        let token = sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(unix_timestamp())
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    pub async fn revoke_token(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every refresh token of an account (forced sign-out).
    pub async fn revoke_account_tokens(&self, account_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE account_id = ? AND revoked = 0")
            .bind(account_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
