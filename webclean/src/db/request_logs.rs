//! リクエストログストレージ
//!
//! 1リクエスト分のログバッファをJSON配列として1行に保存する。

use crate::audit::types::LogRecord;
use crate::common::error::WebError;
use crate::db::migrations::RecordSchema;
use chrono::Utc;
use sqlx::SqlitePool;

/// request_logsテーブル
pub const SCHEMA: RecordSchema = RecordSchema {
    table: "request_logs",
    statements: &[
        "CREATE TABLE IF NOT EXISTS request_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            records TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_request_logs_created_at ON request_logs(created_at)",
    ],
};

/// リクエストログのDB操作
#[derive(Clone)]
pub struct RequestLogStorage {
    pool: SqlitePool,
}

impl RequestLogStorage {
    /// 新しいRequestLogStorageを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// ログバッファを1トランザクションで保存する
    pub async fn insert(&self, records: &[LogRecord]) -> Result<i64, WebError> {
        let payload = serde_json::to_string(records)
            .map_err(|e| WebError::Database(format!("Failed to encode request log: {}", e)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WebError::Database(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query("INSERT INTO request_logs (records, created_at) VALUES (?, ?)")
            .bind(payload)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| WebError::Database(format!("Failed to insert request log: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| WebError::Database(format!("Failed to commit request log: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// 保存済みのバッファを新しい順に取得
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Vec<LogRecord>>, WebError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT records FROM request_logs ORDER BY id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| WebError::Database(format!("Failed to list request logs: {}", e)))?;

        rows.iter()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    WebError::Database(format!("Invalid request log payload: {}", e))
                })
            })
            .collect()
    }
}
