//! ユースケース層
//!
//! リポジトリtraitに対するビジネスルールを実装する。

/// ユーザー管理のユースケース
pub mod users;

pub use users::UserService;
