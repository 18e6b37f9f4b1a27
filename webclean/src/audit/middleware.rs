//! リクエスト監査ミドルウェア
//!
//! 外側から順に次のステージで構成される。
//!
//! 1. リクエストID付与（`request_id_middleware`）
//! 2. エラーレポート永続化（`error_persist_middleware`）
//! 3. panic復旧（`recover_middleware`）
//! 4. コンテキスト注入とログバッファ永続化（`request_context_middleware`）
//!
//! `layer_pipeline`はこの順序でルーターへ適用する。

use crate::api::error::{panic_response, ServerInternalError};
use crate::audit::collector::RequestLogger;
use crate::audit::context::RequestContext;
use crate::audit::types::{ErrorReport, RecordedError, RequestErrors, RequestId};
use crate::common::ip::client_ip;
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::{self as axum_middleware, Next},
    response::Response,
    Router,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// リクエストIDヘッダー
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 監査パイプラインをルーターへ適用する
///
/// `Router::layer`は後から追加したものほど外側になるため、内側のステージから順に追加する。
pub fn layer_pipeline<S>(router: Router<S>, state: &AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            request_context_middleware,
        ))
        .layer(axum_middleware::from_fn(recover_middleware))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            error_persist_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            request_id_middleware,
        ))
}

/// リクエストIDを決定し、extensionsとレスポンスヘッダーへ設定する
///
/// `X-Request-ID`が空でなければそのまま使い、なければ生成する。
pub async fn request_id_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| (state.request_id_generator)());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// 記録されたエラーをリクエスト終了時にレポートとして永続化する
///
/// メタデータは内側を呼ぶ前に取得する。エラーが1件もなければ何もしない。
pub async fn error_persist_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let url = request.uri().to_string();
    let path = request.uri().path().to_string();
    let ip = client_ip(&request);
    let request_id = ensure_request_id(&mut request, &state);

    let errors = RequestErrors::default();
    request.extensions_mut().insert(errors.clone());

    let response = next.run(request).await;

    if let Some(RecordedError(message)) = response.extensions().get::<RecordedError>() {
        errors.record(message.clone());
    }

    let recorded = errors.snapshot();
    if recorded.is_empty() {
        return response;
    }

    let report = ErrorReport {
        stack: ErrorReport::format_stack(&recorded),
        method,
        url,
        path,
        ip,
        request_id: request_id.0,
    };

    let persister = state.error_persister.clone();
    if let Err(payload) = AssertUnwindSafe(persister.persist(report))
        .catch_unwind()
        .await
    {
        error!(
            panic = %panic_message(payload.as_ref()),
            errors = ?recorded,
            "Error persister panicked"
        );
    }

    response
}

/// 内側のpanicを捕捉して500レスポンスへ変換する
///
/// `ServerInternalError`のペイロードはその構築済みボディを返し、
/// それ以外はpanicメッセージを含む汎用ボディを返す。panicはリクエストのエラーとして記録する。
pub async fn recover_middleware(request: Request<Body>, next: Next) -> Response {
    let errors = request.extensions().get::<RequestErrors>().cloned();

    let payload = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => return response,
        Err(payload) => payload,
    };

    let (message, response) = match payload.downcast::<ServerInternalError>() {
        Ok(internal) => (internal.cause().to_string(), internal.body_response()),
        Err(other) => {
            let message = panic_message(other.as_ref());
            let response = panic_response(&message);
            (message, response)
        }
    };

    error!(panic = %message, "Recovered from panic in request handler");
    match errors {
        Some(errors) => errors.record(format!("panic: {}", message)),
        None => debug!("No error sink installed, panic is not reported"),
    }

    response
}

/// RequestContextを注入し、終了時にログバッファを永続化する
///
/// ハンドラーがpanicしてもバッファは1回だけ永続化され、その後panicを再開する。
pub async fn request_context_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = ensure_request_id(&mut request, &state);
    let errors = match request.extensions().get::<RequestErrors>() {
        Some(errors) => errors.clone(),
        None => {
            let errors = RequestErrors::default();
            request.extensions_mut().insert(errors.clone());
            errors
        }
    };

    let collector = RequestLogger::new(state.logger.clone());
    let context = RequestContext::new(
        state.db_pool.clone(),
        Arc::new(collector.clone()),
        request_id,
        errors,
    );
    request.extensions_mut().insert(context);

    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;

    state.log_persister.persist(collector.take()).await;

    match outcome {
        Ok(response) => response,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// extensionsのRequestIdを取得する（未設定なら生成して格納）
fn ensure_request_id(request: &mut Request<Body>, state: &AppState) -> RequestId {
    if let Some(id) = request.extensions().get::<RequestId>() {
        return id.clone();
    }
    let id = RequestId((state.request_id_generator)());
    request.extensions_mut().insert(id.clone());
    id
}

/// panicペイロードからメッセージを取り出す
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(internal) = payload.downcast_ref::<ServerInternalError>() {
        internal.cause().to_string()
    } else {
        "unknown panic".to_string()
    }
}
