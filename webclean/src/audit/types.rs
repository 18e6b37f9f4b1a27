//! リクエスト監査の型定義

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

/// リクエスト中に出力された1件のログ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// ログレベル
    pub level: LogLevel,
    /// 整形済みメッセージ
    pub message: String,
}

impl LogRecord {
    /// 新しいLogRecordを作成
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// 1リクエスト分のログバッファ（出力順を保持）
pub type RequestLogBuffer = Vec<LogRecord>;

/// 1リクエストで記録されたエラーのレポート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// `Error #01: ...` 形式で連結したエラー一覧
    pub stack: String,
    /// HTTPメソッド
    pub method: String,
    /// リクエストURI（クエリ含む）
    pub url: String,
    /// リクエストパス
    pub path: String,
    /// クライアントIP
    pub ip: String,
    /// リクエストID
    pub request_id: String,
}

impl ErrorReport {
    /// 記録済みエラーを1行1件のスタック文字列に整形する
    pub fn format_stack(errors: &[String]) -> String {
        let mut stack = String::new();
        for (i, message) in errors.iter().enumerate() {
            let _ = writeln!(stack, "Error #{:02}: {}", i + 1, message);
        }
        stack
    }
}

/// リクエストID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// 文字列表現を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// リクエストIDの生成関数
pub type RequestIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// UUID v4を返すデフォルトの生成関数
pub fn uuid_request_id_generator() -> RequestIdGenerator {
    Arc::new(|| uuid::Uuid::new_v4().to_string())
}

/// リクエストのエラー記録先
///
/// エラー永続化ミドルウェアが生成してrequest extensionsへ格納し、
/// 内側のステージとハンドラーが共有する。
#[derive(Debug, Clone, Default)]
pub struct RequestErrors(Arc<Mutex<Vec<String>>>);

impl RequestErrors {
    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// エラーを1件記録する
    pub fn record(&self, message: impl Into<String>) {
        self.guard().push(message.into());
    }

    /// 記録済みエラーのコピーを取得
    pub fn snapshot(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// 記録件数
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// 1件も記録されていないか
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

/// レスポンスに添付されるエラー（`AppError`が設定する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedError(pub String);
