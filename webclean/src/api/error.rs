//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::audit::types::RecordedError;
use crate::common::error::WebError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Axum用のエラーレスポンス型
///
/// レスポンスには`RecordedError`が添付され、エラー永続化ミドルウェアが
/// リクエストのエラーとして記録する。
#[derive(Debug)]
pub struct AppError(pub WebError);

impl From<WebError> for AppError {
    fn from(err: WebError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Use external_message() to avoid exposing internal details.
        // Full error details go to the error report.
        let status = self.0.status_code();
        let payload = json!({
            "error": self.0.error_code(),
            "message": self.0.external_message(),
        });

        let mut response = (status, Json(payload)).into_response();
        response
            .extensions_mut()
            .insert(RecordedError(self.0.to_string()));
        response
    }
}

/// 構築済みボディを持つ500エラー
///
/// ハンドラーの前提が満たされない（コンテキスト未設定など）場合の番兵。
/// エクストラクタのrejectionとして返すほか、panicのペイロードとしても
/// 復旧ミドルウェアに認識される。
#[derive(Debug, Clone)]
pub struct ServerInternalError {
    body: Value,
    cause: String,
}

impl ServerInternalError {
    /// ボディと原因を指定して作成
    pub fn new(body: Value, cause: impl Into<String>) -> Self {
        Self {
            body,
            cause: cause.into(),
        }
    }

    /// RequestContextが見つからない場合のエラー
    pub fn context_missing() -> Self {
        Self::new(
            json!({ "message": "request context not found" }),
            WebError::ContextMissing.to_string(),
        )
    }

    /// レスポンスボディ
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// 原因（エラーレポートに記録される）
    pub fn cause(&self) -> &str {
        &self.cause
    }

    /// `RecordedError`を添付しないレスポンス
    pub fn body_response(&self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.body.clone())).into_response()
    }
}

impl std::fmt::Display for ServerInternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cause)
    }
}

impl std::error::Error for ServerInternalError {}

impl IntoResponse for ServerInternalError {
    fn into_response(self) -> Response {
        let mut response = self.body_response();
        response.extensions_mut().insert(RecordedError(self.cause));
        response
    }
}

/// panicから生成する汎用の500レスポンス
pub fn panic_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_server_error",
            "message": message,
        })),
    )
        .into_response()
}
