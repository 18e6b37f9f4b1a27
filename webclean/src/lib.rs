//! webclean Server
//!
//! ユーザーCRUDを提供するHTTPサービスと、リクエスト単位のログ・エラー監査パイプライン

#![warn(missing_docs)]

/// 共通型定義
pub mod common;

/// REST APIハンドラー
pub mod api;

/// リクエスト監査（ログバッファ・エラーレポート・ミドルウェア）
pub mod audit;

/// データベースアクセス
pub mod db;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 設定管理（設定ファイルと環境変数）
pub mod config;

/// ユースケース
pub mod service;

/// 型定義
pub mod types;

/// CLIインターフェース
pub mod cli;

/// サーバー初期化
pub mod bootstrap;

/// axumサーバー起動
pub mod server;

use std::sync::Arc;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: sqlx::SqlitePool,
    /// 基底ロガー（リクエストごとのコレクタが包む）
    pub logger: Arc<dyn logging::StructuredLog>,
    /// ログバッファの永続化
    pub log_persister: Arc<dyn audit::persister::LogPersister>,
    /// エラーレポートの永続化
    pub error_persister: Arc<dyn audit::persister::ErrorStackPersister>,
    /// リクエストIDの生成関数
    pub request_id_generator: audit::types::RequestIdGenerator,
}
