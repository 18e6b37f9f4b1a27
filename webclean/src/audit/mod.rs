//! リクエスト監査
//!
//! リクエスト中のログをバッファして終了時に保存し、記録されたエラーを
//! 1件のレポートとして保存する（保存失敗時はファイルへ退避）。

/// 監査の型定義
pub mod types;

/// リクエスト単位のログ収集
pub mod collector;

/// ハンドラー向けリクエストコンテキスト
pub mod context;

/// ログバッファ・エラーレポートの永続化
pub mod persister;

/// 監査ミドルウェア
pub mod middleware;
