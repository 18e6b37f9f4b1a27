//! エラーレポートストレージ

use crate::audit::types::ErrorReport;
use crate::common::error::WebError;
use crate::db::migrations::RecordSchema;
use chrono::Utc;
use sqlx::SqlitePool;

/// request_errorsテーブル
pub const SCHEMA: RecordSchema = RecordSchema {
    table: "request_errors",
    statements: &[
        "CREATE TABLE IF NOT EXISTS request_errors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stack TEXT NOT NULL,
            method TEXT NOT NULL,
            url TEXT NOT NULL,
            path TEXT NOT NULL,
            ip TEXT NOT NULL,
            request_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_request_errors_request_id ON request_errors(request_id)",
    ],
};

/// エラーレポートのDB操作
#[derive(Clone)]
pub struct ErrorReportStorage {
    pool: SqlitePool,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct ErrorReportRow {
    stack: String,
    method: String,
    url: String,
    path: String,
    ip: String,
    request_id: String,
}

impl From<ErrorReportRow> for ErrorReport {
    fn from(row: ErrorReportRow) -> Self {
        Self {
            stack: row.stack,
            method: row.method,
            url: row.url,
            path: row.path,
            ip: row.ip,
            request_id: row.request_id,
        }
    }
}

impl ErrorReportStorage {
    /// 新しいErrorReportStorageを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// レポートを1トランザクションで保存する
    pub async fn insert(&self, report: &ErrorReport) -> Result<i64, WebError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WebError::Database(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO request_errors (stack, method, url, path, ip, request_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&report.stack)
        .bind(&report.method)
        .bind(&report.url)
        .bind(&report.path)
        .bind(&report.ip)
        .bind(&report.request_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| WebError::Database(format!("Failed to insert error report: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| WebError::Database(format!("Failed to commit error report: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// リクエストIDでレポートを検索
    pub async fn find_by_request_id(&self, request_id: &str) -> Result<Vec<ErrorReport>, WebError> {
        let rows = sqlx::query_as::<_, ErrorReportRow>(
            "SELECT stack, method, url, path, ip, request_id FROM request_errors
             WHERE request_id = ? ORDER BY id ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to find error reports: {}", e)))?;

        Ok(rows.into_iter().map(ErrorReport::from).collect())
    }
}
