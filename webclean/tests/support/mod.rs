//! 結合テスト用の共通ユーティリティ

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use webclean::audit::persister::{ErrorStackPersister, LogPersister};
use webclean::audit::types::{ErrorReport, RequestLogBuffer};
use webclean::config::AppConfig;
use webclean::AppState;

/// インメモリDBとフォールバック先ディレクトリでAppStateを構築する
pub async fn memory_state(fallback_dir: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.errors.fallback_dir = fallback_dir.to_path_buf();
    webclean::bootstrap::build_state(&config)
        .await
        .expect("failed to build state")
}

/// 受け取ったログバッファを記録しつつ内側へ委譲するLogPersister
#[derive(Clone)]
pub struct SpyLogPersister {
    inner: Arc<dyn LogPersister>,
    calls: Arc<Mutex<Vec<RequestLogBuffer>>>,
}

impl SpyLogPersister {
    pub fn wrap(inner: Arc<dyn LogPersister>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RequestLogBuffer> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogPersister for SpyLogPersister {
    async fn persist(&self, buffer: RequestLogBuffer) {
        self.calls.lock().unwrap().push(buffer.clone());
        self.inner.persist(buffer).await;
    }
}

/// 受け取ったエラーレポートを記録しつつ内側へ委譲するErrorStackPersister
#[derive(Clone)]
pub struct SpyErrorPersister {
    inner: Arc<dyn ErrorStackPersister>,
    calls: Arc<Mutex<Vec<ErrorReport>>>,
}

impl SpyErrorPersister {
    pub fn wrap(inner: Arc<dyn ErrorStackPersister>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<ErrorReport> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorStackPersister for SpyErrorPersister {
    async fn persist(&self, report: ErrorReport) {
        self.calls.lock().unwrap().push(report.clone());
        self.inner.persist(report).await;
    }
}

/// リクエストを送り、ステータス・ヘッダーのリクエストID・JSONボディを返す
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, request_id, body)
}

/// JSONボディ付きリクエストを組み立てる
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// ボディなしリクエストを組み立てる
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
