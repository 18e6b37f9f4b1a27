//! リクエスト監査パイプライン Contract Tests
//!
//! ログバッファとエラーレポートが実ストアへ保存されること、
//! ストアが使えない場合にフォールバックファイルへ退避されることを確認する。

use crate::support::{
    empty_request, json_request, memory_state, send, SpyErrorPersister, SpyLogPersister,
};
use axum::http::{Request, StatusCode};
use axum::body::Body;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use webclean::api::create_app;
use webclean::audit::persister::StoreErrorPersister;
use webclean::audit::types::ErrorReport;
use webclean::db::request_errors::ErrorReportStorage;
use webclean::db::request_logs::RequestLogStorage;

#[tokio::test]
async fn test_successful_request_stores_log_buffer_without_report() {
    let dir = tempfile::tempdir().unwrap();
    let state = memory_state(dir.path()).await;
    let pool = state.db_pool.clone();
    let app = create_app(state);

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users",
            &json!({"email": "frank@example.com", "username": "frank", "name": "Frank"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let buffers = RequestLogStorage::new(pool.clone()).list_recent(10).await.unwrap();
    assert_eq!(buffers.len(), 1);
    assert!(buffers[0]
        .iter()
        .any(|record| record.message.contains("CreateUser")));

    let errors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_errors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(errors, 0);
}

#[tokio::test]
async fn test_failed_request_stores_report_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let state = memory_state(dir.path()).await;
    let pool = state.db_pool.clone();
    let app = create_app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users/not-a-uuid?verbose=1")
        .header("x-request-id", "audit-req-1")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, request_id, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(request_id.as_deref(), Some("audit-req-1"));
    assert_eq!(body["error"], "invalid_id");

    let reports = ErrorReportStorage::new(pool)
        .find_by_request_id("audit-req-1")
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.method, "GET");
    assert_eq!(report.url, "/api/v1/users/not-a-uuid?verbose=1");
    assert_eq!(report.path, "/api/v1/users/not-a-uuid");
    assert_eq!(report.ip, "203.0.113.7");
    assert!(report.stack.starts_with("Error #01: "));
    assert_eq!(report.stack.lines().count(), 1);
}

#[tokio::test]
async fn test_report_falls_back_to_file_when_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let fallback_dir = dir.path().join("errors");
    let mut state = memory_state(dir.path()).await;

    let broken = SqlitePool::connect("sqlite::memory:").await.unwrap();
    broken.close().await;
    let reports = SpyErrorPersister::wrap(Arc::new(StoreErrorPersister::new(
        ErrorReportStorage::new(broken),
        fallback_dir.clone(),
    )));
    let logs = SpyLogPersister::wrap(state.log_persister.clone());
    state.error_persister = Arc::new(reports.clone());
    state.log_persister = Arc::new(logs.clone());
    let app = create_app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users?limit=1000")
        .header("x-request-id", "fallback/req")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(logs.calls().len(), 1);
    assert_eq!(reports.calls().len(), 1);

    let files: Vec<_> = std::fs::read_dir(&fallback_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("error_fallback_req_"), "name: {}", name);
    assert!(name.ends_with(".json"));

    let content: Value = serde_json::from_slice(&std::fs::read(&files[0]).unwrap()).unwrap();
    assert_eq!(content["requestId"], "fallback/req");
    assert_eq!(content["url"], "/api/v1/users?limit=1000");
    let written: ErrorReport = serde_json::from_value(content).unwrap();
    assert_eq!(written, reports.calls()[0]);
}

#[tokio::test]
async fn test_each_request_gets_its_own_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = memory_state(dir.path()).await;
    let logs = SpyLogPersister::wrap(state.log_persister.clone());
    state.log_persister = Arc::new(logs.clone());
    let app = create_app(state);

    let (_, first_id, _) = send(&app, empty_request("GET", "/api/v1/users")).await;
    let (_, second_id, _) = send(&app, empty_request("GET", "/api/v1/users?offset=5")).await;
    assert_ne!(first_id, second_id);

    let calls = logs.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|buffer| buffer
        .iter()
        .filter(|record| record.message.contains("ListUsers"))
        .count()
        == 1));
}
