//! サーバー初期化ロジック
//!
//! データベース接続、スキーマ適用、監査パイプラインの永続化先など
//! サーバー起動に必要なコンポーネントの初期化を担当する。

use crate::audit::persister::{StoreErrorPersister, StoreLogPersister};
use crate::audit::types::uuid_request_id_generator;
use crate::common::error::WebResult;
use crate::config::AppConfig;
use crate::db::migrations::initialize_database;
use crate::db::request_errors::ErrorReportStorage;
use crate::db::request_logs::RequestLogStorage;
use crate::db::APPLICATION_SCHEMAS;
use crate::logging::TracingLog;
use crate::AppState;
use std::sync::Arc;
use tracing::info;

/// 設定から`AppState`を構築する
///
/// DB接続とスキーマ適用を行い、ログバッファとエラーレポートの永続化先を
/// 同じ接続プール上のストレージに向ける。
pub async fn build_state(config: &AppConfig) -> WebResult<AppState> {
    info!("webclean v{}", env!("CARGO_PKG_VERSION"));

    let db_pool = initialize_database(&config.database.url, &APPLICATION_SCHEMAS).await?;
    info!(url = %config.database.url, "Database initialized");

    let log_persister = StoreLogPersister::new(RequestLogStorage::new(db_pool.clone()));
    let error_persister = StoreErrorPersister::new(
        ErrorReportStorage::new(db_pool.clone()),
        config.errors.fallback_dir.clone(),
    );
    info!(
        fallback_dir = %config.errors.fallback_dir.display(),
        production = config.production,
        "Request audit pipeline configured"
    );

    Ok(AppState {
        db_pool,
        logger: Arc::new(TracingLog),
        log_persister: Arc::new(log_persister),
        error_persister: Arc::new(error_persister),
        request_id_generator: uuid_request_id_generator(),
    })
}
