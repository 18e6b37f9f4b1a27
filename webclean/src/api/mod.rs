//! REST APIルーター

/// APIエラーレスポンス型
pub mod error;

/// ユーザー管理API
pub mod users;

use crate::audit::middleware::layer_pipeline;
use crate::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// アプリケーションのルーターを構築する
///
/// `/api/v1` 配下には監査パイプラインを適用し、`/health` は対象外とする。
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let api = layer_pipeline(Router::new().nest("/api/v1", api_routes), &state);

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - 死活確認
async fn health() -> &'static str {
    "ok"
}
