//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// データベースマイグレーション
pub mod migrations;

/// ユーザー管理
pub mod users;

/// リクエストログストレージ
pub mod request_logs;

/// エラーレポートストレージ
pub mod request_errors;

/// Repository traitパターン（テスタビリティ向上）
pub mod traits;

use migrations::RecordSchema;

/// アプリケーションが使用するテーブル
pub const APPLICATION_SCHEMAS: [RecordSchema; 3] =
    [users::SCHEMA, request_logs::SCHEMA, request_errors::SCHEMA];
