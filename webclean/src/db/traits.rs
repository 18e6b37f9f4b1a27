//! Repository traitパターン定義
//!
//! DB操作を抽象化し、テスタビリティを向上させるためのtrait群。
//! 各traitは既存のフリー関数/構造体メソッドに対応する。

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::audit::types::{ErrorReport, LogRecord};
use crate::common::error::WebResult;
use crate::types::User;

use super::request_errors::ErrorReportStorage;
use super::request_logs::RequestLogStorage;

// ---------------------------------------------------------------------------
// UserRepository
// ---------------------------------------------------------------------------

/// ユーザーCRUD操作のRepository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを作成
    async fn create(&self, user: &User) -> WebResult<()>;
    /// IDでユーザーを検索
    async fn find_by_id(&self, id: Uuid) -> WebResult<Option<User>>;
    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> WebResult<Option<User>>;
    /// ユーザー名でユーザーを検索
    async fn find_by_username(&self, username: &str) -> WebResult<Option<User>>;
    /// ユーザーを更新（該当なしなら`false`）
    async fn update(&self, user: &User) -> WebResult<bool>;
    /// ユーザーを削除（該当なしなら`false`）
    async fn delete(&self, id: Uuid) -> WebResult<bool>;
    /// ユーザー一覧を取得
    async fn list(&self, offset: i64, limit: i64) -> WebResult<Vec<User>>;
    /// ユーザー総数
    async fn count(&self) -> WebResult<i64>;
}

#[async_trait]
impl UserRepository for SqlitePool {
    async fn create(&self, user: &User) -> WebResult<()> {
        super::users::create(self, user).await
    }

    async fn find_by_id(&self, id: Uuid) -> WebResult<Option<User>> {
        super::users::find_by_id(self, id).await
    }

    async fn find_by_email(&self, email: &str) -> WebResult<Option<User>> {
        super::users::find_by_email(self, email).await
    }

    async fn find_by_username(&self, username: &str) -> WebResult<Option<User>> {
        super::users::find_by_username(self, username).await
    }

    async fn update(&self, user: &User) -> WebResult<bool> {
        super::users::update(self, user).await
    }

    async fn delete(&self, id: Uuid) -> WebResult<bool> {
        super::users::delete(self, id).await
    }

    async fn list(&self, offset: i64, limit: i64) -> WebResult<Vec<User>> {
        super::users::list(self, offset, limit).await
    }

    async fn count(&self) -> WebResult<i64> {
        super::users::count(self).await
    }
}

// ---------------------------------------------------------------------------
// RequestLogRepository / ErrorReportRepository
// ---------------------------------------------------------------------------

/// リクエストログ保存のRepository trait
#[async_trait]
pub trait RequestLogRepository: Send + Sync {
    /// 1リクエスト分のログを1トランザクションで保存
    async fn insert_request_log(&self, records: &[LogRecord]) -> WebResult<()>;
}

#[async_trait]
impl RequestLogRepository for RequestLogStorage {
    async fn insert_request_log(&self, records: &[LogRecord]) -> WebResult<()> {
        self.insert(records).await.map(|_| ())
    }
}

/// エラーレポート保存のRepository trait
#[async_trait]
pub trait ErrorReportRepository: Send + Sync {
    /// レポートを1トランザクションで保存
    async fn insert_error_report(&self, report: &ErrorReport) -> WebResult<()>;
}

#[async_trait]
impl ErrorReportRepository for ErrorReportStorage {
    async fn insert_error_report(&self, report: &ErrorReport) -> WebResult<()> {
        self.insert(report).await.map(|_| ())
    }
}
