//! Account repository implementation

use sqlx::PgPool;
use crate::models::account::{Account, CreateAccountRequest};
use crate::utils::errors::TaskBuddyError;

const ACCOUNT_COLUMNS: &str =
    "user_uuid, owner_telegram_id, login_name, username, password_hash, is_login, registration_date";

#[derive(Clone)]
#[derive(Debug)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new account
    pub async fn create(&self, request: CreateAccountRequest) -> Result<Account, TaskBuddyError> {
        let account = sqlx::query_as::<_, Account>(
            &format!(
                r#"
                INSERT INTO users (owner_telegram_id, login_name, username, password_hash, is_login)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                ACCOUNT_COLUMNS
            )
        )
        .bind(request.owner_telegram_id)
        .bind(request.login_name)
        .bind(request.username)
        .bind(request.password_hash)
        .bind(request.is_login)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Find the account linked to a Telegram user
    pub async fn find_by_owner(&self, owner_telegram_id: i64) -> Result<Option<Account>, TaskBuddyError> {
        let account = sqlx::query_as::<_, Account>(
            &format!("SELECT {} FROM users WHERE owner_telegram_id = $1", ACCOUNT_COLUMNS)
        )
        .bind(owner_telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Find account by login name
    pub async fn find_by_login_name(&self, login_name: &str) -> Result<Option<Account>, TaskBuddyError> {
        let account = sqlx::query_as::<_, Account>(
            &format!("SELECT {} FROM users WHERE login_name = $1", ACCOUNT_COLUMNS)
        )
        .bind(login_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn set_login(&self, owner_telegram_id: i64, is_login: bool) -> Result<(), TaskBuddyError> {
        let result = sqlx::query("UPDATE users SET is_login = $1 WHERE owner_telegram_id = $2")
            .bind(is_login)
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        ensure_updated(result.rows_affected(), owner_telegram_id)
    }

    pub async fn update_username(&self, owner_telegram_id: i64, username: &str) -> Result<(), TaskBuddyError> {
        let result = sqlx::query("UPDATE users SET username = $1 WHERE owner_telegram_id = $2")
            .bind(username)
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        ensure_updated(result.rows_affected(), owner_telegram_id)
    }

    pub async fn update_login_name(&self, owner_telegram_id: i64, login_name: &str) -> Result<(), TaskBuddyError> {
        let result = sqlx::query("UPDATE users SET login_name = $1 WHERE owner_telegram_id = $2")
            .bind(login_name)
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        ensure_updated(result.rows_affected(), owner_telegram_id)
    }

    pub async fn update_password_hash(&self, owner_telegram_id: i64, password_hash: &str) -> Result<(), TaskBuddyError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE owner_telegram_id = $2")
            .bind(password_hash)
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        ensure_updated(result.rows_affected(), owner_telegram_id)
    }

    /// Delete account; its tasks are removed by the foreign key cascade
    pub async fn delete(&self, owner_telegram_id: i64) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query("DELETE FROM users WHERE owner_telegram_id = $1")
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count total accounts
    pub async fn count(&self) -> Result<i64, TaskBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

fn ensure_updated(rows_affected: u64, owner_telegram_id: i64) -> Result<(), TaskBuddyError> {
    if rows_affected == 0 {
        return Err(TaskBuddyError::AccountNotFound { owner_telegram_id });
    }
    Ok(())
}
