use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

use crate::core::DbError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Tenant,
}

impl Role {
    /// Admin and staff manage the property; tenants only see their own records.
    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Tenant => "tenant",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "tenant" => Ok(Self::Tenant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

pub async fn create_user(db: impl SqliteExecutor<'_>, new_user: NewUser) -> Result<User, DbError> {
    let user = sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (username, password_hash, email, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING id, username, password_hash, email, role, created_at, updated_at
        ",
    )
    .bind(new_user.username)
    .bind(new_user.password_hash)
    .bind(new_user.email)
    .bind(new_user.role)
    .fetch_one(db)
    .await?;
    Ok(user)
}

pub async fn get_user_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<User, DbError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, username, password_hash, email, role, created_at, updated_at
        FROM users
        WHERE id = ?
        ",
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(user)
}

pub async fn get_user_by_name(db: impl SqliteExecutor<'_>, username: &str) -> Result<User, DbError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, username, password_hash, email, role, created_at, updated_at
        FROM users
        WHERE username = ?
        ",
    )
    .bind(username)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Ids of every admin and staff account, used as notification fan-out targets.
pub async fn list_manager_ids(db: impl SqliteExecutor<'_>) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE role IN ('admin', 'staff') ORDER BY id")
        .fetch_all(db)
        .await?;
    Ok(ids)
}
