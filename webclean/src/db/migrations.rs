//! データベース初期化とスキーマ適用
//!
//! 各ストレージモジュールは自身のテーブル定義を`RecordSchema`として公開し、
//! 呼び出し側が適用するスキーマの一覧を明示的に渡す。

use crate::common::error::WebError;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

/// 1テーブル分のスキーマ定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// テーブル名
    pub table: &'static str,
    /// 作成用のSQL（冪等であること）
    pub statements: &'static [&'static str],
}

/// SQLiteデータベース接続プールを作成してスキーマを適用
///
/// # Arguments
/// * `database_url` - データベースURL（例: "sqlite:webclean.db"）
/// * `schemas` - 適用するスキーマ
///
/// # Returns
/// * `Ok(SqlitePool)` - 初期化済みデータベースプール
/// * `Err(WebError)` - 初期化失敗
pub async fn initialize_database(
    database_url: &str,
    schemas: &[RecordSchema],
) -> Result<SqlitePool, WebError> {
    // データベースファイルが存在しない場合は作成
    if !Sqlite::database_exists(database_url)
        .await
        .map_err(|e| WebError::Database(format!("Failed to check database: {}", e)))?
    {
        tracing::info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .map_err(|e| WebError::Database(format!("Failed to create database: {}", e)))?;
    }

    let pool = SqlitePool::connect(database_url)
        .await
        .map_err(|e| WebError::Database(format!("Failed to connect to database: {}", e)))?;

    run_migrations(&pool, schemas).await?;

    Ok(pool)
}

/// スキーマを1トランザクションで適用する
pub async fn run_migrations(pool: &SqlitePool, schemas: &[RecordSchema]) -> Result<(), WebError> {
    tracing::info!(count = schemas.len(), "Applying database schemas");

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| WebError::Database(format!("Failed to begin migration: {}", e)))?;

    for schema in schemas {
        for statement in schema.statements {
            sqlx::query(*statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    WebError::Database(format!(
                        "Failed to apply schema for {}: {}",
                        schema.table, e
                    ))
                })?;
        }
        tracing::debug!(table = schema.table, "Schema applied");
    }

    tx.commit()
        .await
        .map_err(|e| WebError::Database(format!("Failed to commit migration: {}", e)))?;

    tracing::info!("Database schemas applied successfully");
    Ok(())
}
