//! ユーザー管理API Contract Tests
//!
//! POST/GET /api/v1/users, GET/PUT/DELETE /api/v1/users/{id}

use crate::support::{empty_request, json_request, memory_state, send};
use axum::http::StatusCode;
use serde_json::json;
use webclean::api::create_app;

async fn build_app() -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = memory_state(dir.path()).await;
    (create_app(state), dir)
}

async fn create(app: &axum::Router, email: &str, username: &str) -> String {
    let (status, _, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/users",
            &json!({"email": email, "username": username, "name": "Test User"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_user_returns_created_resource() {
    let (app, _dir) = build_app().await;

    let (status, request_id, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users",
            &json!({"email": "carol@example.com", "username": "carol", "name": "Carol"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(request_id.is_some());
    assert_eq!(body["email"], "carol@example.com");
    assert_eq!(body["username"], "carol");
    assert_eq!(body["name"], "Carol");
    assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    assert_eq!(body["created_at"], body["updated_at"]);
}

#[tokio::test]
async fn test_duplicate_email_or_username_conflicts() {
    let (app, _dir) = build_app().await;
    create(&app, "dave@example.com", "dave").await;

    for payload in [
        json!({"email": "dave@example.com", "username": "other", "name": "Dave"}),
        json!({"email": "other@example.com", "username": "dave", "name": "Dave"}),
    ] {
        let (status, _, body) = send(&app, json_request("POST", "/api/v1/users", &payload)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "user_already_exists");
    }
}

#[tokio::test]
async fn test_get_update_delete_lifecycle() {
    let (app, _dir) = build_app().await;
    let id = create(&app, "erin@example.com", "erin").await;
    let uri = format!("/api/v1/users/{}", id);

    let (status, _, body) = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "erin");

    let (status, _, body) = send(&app, json_request("PUT", &uri, &json!({"name": "Erin B."}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Erin B.");

    let (status, _, _) = send(&app, json_request("PUT", &uri, &json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _, body) = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");

    let (status, _, _) = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_users_pagination() {
    let (app, _dir) = build_app().await;
    for i in 0..3 {
        create(&app, &format!("user{}@example.com", i), &format!("user{}", i)).await;
    }

    let (status, _, body) = send(&app, empty_request("GET", "/api/v1/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
    assert_eq!(body["has_more"], false);

    let (status, _, body) = send(&app, empty_request("GET", "/api/v1/users?offset=1&limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], true);

    for uri in [
        "/api/v1/users?offset=abc",
        "/api/v1/users?limit=0",
        "/api/v1/users?limit=500",
    ] {
        let (status, _, _) = send(&app, empty_request("GET", uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
    }
}

#[tokio::test]
async fn test_list_users_accepts_maximum_offset() {
    let (app, _dir) = build_app().await;
    create(&app, "grace@example.com", "grace").await;

    let (status, _, body) = send(
        &app,
        empty_request("GET", "/api/v1/users?offset=9223372036854775807"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offset"], i64::MAX);
    assert_eq!(body["total"], 1);
    assert!(body["users"].as_array().unwrap().is_empty());
    assert_eq!(body["has_more"], false);
}
