//! 型定義モジュール
//!
//! ドメインエンティティの型定義を提供

/// ユーザー関連の型定義
pub mod user;

pub use user::User;
