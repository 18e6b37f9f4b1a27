//! ユーザーエンティティ

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ユーザー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID
    pub id: Uuid,
    /// メールアドレス（一意）
    pub email: String,
    /// ユーザー名（一意）
    pub username: String,
    /// 表示名
    pub name: String,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// IDとタイムスタンプを生成して新しいユーザーを作成
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 表示名を更新する
    pub fn update_profile(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }

    /// 必須項目がすべて設定されているか
    pub fn is_valid(&self) -> bool {
        !self.id.is_nil() && !self.email.is_empty() && !self.username.is_empty() && !self.name.is_empty()
    }
}
