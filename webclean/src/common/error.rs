//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! `WebError`は`error_code()`・`external_message()`・`status_code()`を提供し、
//! HTTPハンドラーはこれを元に `{"error": ..., "message": ...}` 形式のレスポンスを生成する。

use axum::http::StatusCode;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// UUID parse error
    #[error("UUID parse error: {0}")]
    UuidParse(#[from] uuid::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// サービス全体のエラー型
#[derive(Debug, Error)]
pub enum WebError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// User not found
    #[error("user not found")]
    UserNotFound,

    /// Email or username already taken
    #[error("user already exists")]
    UserAlreadyExists,

    /// Entity failed business validation
    #[error("invalid user data")]
    InvalidUserData,

    /// Malformed request (path, query or body)
    #[error("Bad request ({code}): {message}")]
    BadRequest {
        /// 機械可読なエラーコード
        code: &'static str,
        /// 人間向けメッセージ
        message: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// RequestContextがリクエストに存在しない（ミドルウェア構成の不備）
    #[error("request context not found, check that the context middleware is installed")]
    ContextMissing,
}

impl WebError {
    /// Builds a `BadRequest` error.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// クライアントへ返す機械可読なエラーコード
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Common(CommonError::Validation(_)) => "invalid_request",
            Self::Common(CommonError::UuidParse(_)) => "invalid_id",
            Self::Common(_) => "internal_server_error",
            Self::UserNotFound => "user_not_found",
            Self::UserAlreadyExists => "user_already_exists",
            Self::InvalidUserData => "invalid_user_data",
            Self::BadRequest { code, .. } => code,
            Self::Database(_) => "internal_server_error",
            Self::Internal(_) => "internal_server_error",
            Self::ContextMissing => "internal_server_error",
        }
    }

    /// Returns a safe error message for external clients.
    ///
    /// Database and internal details only go to the server logs; clients get
    /// a generic message for those.
    pub fn external_message(&self) -> String {
        match self {
            Self::Common(CommonError::Validation(message)) => message.clone(),
            Self::Common(CommonError::UuidParse(_)) => "Invalid user ID format".to_string(),
            Self::Common(_) => "An internal error occurred".to_string(),
            Self::UserNotFound => "User not found".to_string(),
            Self::UserAlreadyExists => "User with email or username already exists".to_string(),
            Self::InvalidUserData => "Invalid user data provided".to_string(),
            Self::BadRequest { message, .. } => message.clone(),
            Self::Database(_) | Self::Internal(_) | Self::ContextMissing => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Common(CommonError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Common(CommonError::UuidParse(_)) => StatusCode::BAD_REQUEST,
            Self::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidUserData => StatusCode::BAD_REQUEST,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ContextMissing => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (service)
pub type WebResult<T> = Result<T, WebError>;
