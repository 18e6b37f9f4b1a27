//! リクエストコンテキスト
//!
//! コンテキスト注入ミドルウェアがrequest extensionsへ格納し、
//! ハンドラーは`RequestContext`エクストラクタで受け取る。

use crate::api::error::ServerInternalError;
use crate::audit::types::{RequestErrors, RequestId};
use crate::logging::StructuredLog;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;
use std::sync::Arc;

/// 1リクエスト分のハンドラー向けコンテキスト
#[derive(Clone)]
pub struct RequestContext {
    db: SqlitePool,
    logger: Arc<dyn StructuredLog>,
    request_id: RequestId,
    errors: RequestErrors,
}

impl RequestContext {
    /// コンテキストを作成
    pub fn new(
        db: SqlitePool,
        logger: Arc<dyn StructuredLog>,
        request_id: RequestId,
        errors: RequestErrors,
    ) -> Self {
        Self {
            db,
            logger,
            request_id,
            errors,
        }
    }

    /// データベース接続プール
    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// リクエストのログコレクタ
    pub fn logger(&self) -> Arc<dyn StructuredLog> {
        self.logger.clone()
    }

    /// リクエストID
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// レスポンスを変えずにエラーを記録する
    pub fn record_error(&self, error: impl std::fmt::Display) {
        self.errors.record(error.to_string());
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("errors", &self.errors.len())
            .finish()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ServerInternalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(ServerInternalError::context_missing)
    }
}
