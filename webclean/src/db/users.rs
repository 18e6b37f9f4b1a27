//! ユーザーCRUD操作

use crate::common::error::WebError;
use crate::db::migrations::RecordSchema;
use crate::types::User;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// usersテーブル
pub const SCHEMA: RecordSchema = RecordSchema {
    table: "users",
    statements: &[
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)",
    ],
};

const USER_COLUMNS: &str = "id, email, username, name, created_at, updated_at";

/// ユーザーを作成
///
/// # Returns
/// * `Ok(())` - 作成成功
/// * `Err(WebError::UserAlreadyExists)` - メールアドレスまたはユーザー名が重複
/// * `Err(WebError::Database)` - 作成失敗
pub async fn create(pool: &SqlitePool, user: &User) -> Result<(), WebError> {
    sqlx::query(
        "INSERT INTO users (id, email, username, name, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.name)
    .bind(user.created_at.to_rfc3339())
    .bind(user.updated_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            WebError::UserAlreadyExists
        } else {
            WebError::Database(format!("Failed to create user: {}", e))
        }
    })?;

    Ok(())
}

/// IDでユーザーを検索
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, WebError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| WebError::Database(format!("Failed to find user: {}", e)))?;

    row.map(UserRow::into_user).transpose()
}

/// メールアドレスでユーザーを検索
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, WebError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| WebError::Database(format!("Failed to find user: {}", e)))?;

    row.map(UserRow::into_user).transpose()
}

/// ユーザー名でユーザーを検索
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, WebError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| WebError::Database(format!("Failed to find user: {}", e)))?;

    row.map(UserRow::into_user).transpose()
}

/// ユーザーを更新
///
/// # Returns
/// * `Ok(true)` - 更新された
/// * `Ok(false)` - 該当ユーザーなし
pub async fn update(pool: &SqlitePool, user: &User) -> Result<bool, WebError> {
    let result =
        sqlx::query("UPDATE users SET email = ?, username = ?, name = ?, updated_at = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.name)
            .bind(user.updated_at.to_rfc3339())
            .bind(user.id.to_string())
            .execute(pool)
            .await
            .map_err(|e| WebError::Database(format!("Failed to update user: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// ユーザーを削除
///
/// # Returns
/// * `Ok(true)` - 削除された
/// * `Ok(false)` - 該当ユーザーなし
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, WebError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to delete user: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// ユーザー一覧を作成日時の降順で取得
pub async fn list(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<User>, WebError> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| WebError::Database(format!("Failed to list users: {}", e)))?;

    rows.into_iter().map(UserRow::into_user).collect()
}

/// ユーザー総数
pub async fn count(pool: &SqlitePool) -> Result<i64, WebError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to count users: {}", e)))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    username: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User, WebError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| WebError::Database(format!("Invalid user id '{}': {}", self.id, e)))?;
        Ok(User {
            id,
            email: self.email,
            username: self.username,
            name: self.name,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WebError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WebError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}
