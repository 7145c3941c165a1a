//! Account model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub user_uuid: Uuid,
    pub owner_telegram_id: i64,
    pub login_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_login: bool,
    pub registration_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    pub owner_telegram_id: i64,
    pub login_name: String,
    pub username: String,
    pub password_hash: String,
    pub is_login: bool,
}
