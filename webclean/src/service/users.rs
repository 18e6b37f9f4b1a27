//! ユーザー管理のユースケース

use crate::common::error::{WebError, WebResult};
use crate::db::traits::UserRepository;
use crate::logging::{field, StructuredLog};
use crate::types::User;
use std::sync::Arc;
use uuid::Uuid;

/// 一覧取得のデフォルト件数
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// 一覧取得の最大件数
pub const MAX_LIST_LIMIT: i64 = 100;

/// ユーザー作成リクエスト
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    /// メールアドレス
    pub email: String,
    /// ユーザー名
    pub username: String,
    /// 表示名
    pub name: String,
}

/// プロフィール更新リクエスト
#[derive(Debug, Clone)]
pub struct UpdateUserProfileRequest {
    /// 対象ユーザーID
    pub id: Uuid,
    /// 新しい表示名
    pub name: String,
}

/// 一覧取得リクエスト
#[derive(Debug, Clone, Copy)]
pub struct ListUsersRequest {
    /// 開始位置
    pub offset: i64,
    /// 取得件数（0以下はデフォルト、上限超過は上限に丸める）
    pub limit: i64,
}

/// 一覧取得結果
#[derive(Debug, Clone)]
pub struct ListUsersResponse {
    /// ユーザー
    pub users: Vec<User>,
    /// 総件数
    pub total: i64,
    /// 開始位置
    pub offset: i64,
    /// 適用された取得件数
    pub limit: i64,
    /// 続きがあるか
    pub has_more: bool,
}

/// ユーザー管理サービス
///
/// ログはリクエストのロガーへ出力するため、リクエストごとに生成する。
pub struct UserService<R> {
    repository: R,
    logger: Arc<dyn StructuredLog>,
}

impl<R: UserRepository> UserService<R> {
    /// 新しいUserServiceを作成
    pub fn new(repository: R, logger: Arc<dyn StructuredLog>) -> Self {
        Self { repository, logger }
    }

    /// ユーザーを作成する
    ///
    /// メールアドレスかユーザー名が使用済みなら`UserAlreadyExists`。
    pub async fn create_user(&self, request: CreateUserRequest) -> WebResult<User> {
        self.logger.info(
            "CreateUser",
            &[
                field("email", &request.email),
                field("username", &request.username),
            ],
        );

        if let Ok(Some(_)) = self.repository.find_by_email(&request.email).await {
            self.logger.warn(
                "User creation failed - email already exists",
                &[field("email", &request.email)],
            );
            return Err(WebError::UserAlreadyExists);
        }

        if let Ok(Some(_)) = self.repository.find_by_username(&request.username).await {
            self.logger.warn(
                "User creation failed - username already exists",
                &[field("username", &request.username)],
            );
            return Err(WebError::UserAlreadyExists);
        }

        let user = User::new(request.email, request.username, request.name);
        if !user.is_valid() {
            self.logger
                .error("User creation failed - invalid data", &[field("user", &user)]);
            return Err(WebError::InvalidUserData);
        }

        if let Err(e) = self.repository.create(&user).await {
            self.logger.error(
                "Failed to create user",
                &[field("error", &e.to_string()), field("user", &user)],
            );
            return Err(e);
        }

        self.logger.info(
            "User created successfully",
            &[field("userID", &user.id), field("email", &user.email)],
        );
        Ok(user)
    }

    /// IDでユーザーを取得する
    pub async fn get_user_by_id(&self, id: Uuid) -> WebResult<User> {
        self.logger.info("GetUserByID", &[field("userID", &id)]);
        self.lookup(id, "Failed to get user by ID", "User not found")
            .await
    }

    /// メールアドレスでユーザーを取得する
    pub async fn get_user_by_email(&self, email: &str) -> WebResult<User> {
        self.logger.info("GetUserByEmail", &[field("email", email)]);

        match self.repository.find_by_email(email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                self.logger.warn("User not found", &[field("email", email)]);
                Err(WebError::UserNotFound)
            }
            Err(e) => {
                self.logger.error(
                    "Failed to get user by email",
                    &[field("error", &e.to_string()), field("email", email)],
                );
                Err(WebError::UserNotFound)
            }
        }
    }

    /// 表示名を更新する
    pub async fn update_user_profile(&self, request: UpdateUserProfileRequest) -> WebResult<User> {
        self.logger.info(
            "UpdateUserProfile",
            &[field("userID", &request.id), field("name", &request.name)],
        );

        let mut user = self
            .lookup(
                request.id,
                "Failed to get user for update",
                "User not found for update",
            )
            .await?;

        user.update_profile(request.name);
        if !user.is_valid() {
            self.logger
                .error("User update failed - invalid data", &[field("user", &user)]);
            return Err(WebError::InvalidUserData);
        }

        match self.repository.update(&user).await {
            Ok(true) => {}
            Ok(false) => {
                self.logger
                    .warn("User not found for update", &[field("userID", &user.id)]);
                return Err(WebError::UserNotFound);
            }
            Err(e) => {
                self.logger.error(
                    "Failed to update user",
                    &[field("error", &e.to_string()), field("userID", &user.id)],
                );
                return Err(e);
            }
        }

        self.logger
            .info("User profile updated successfully", &[field("userID", &user.id)]);
        Ok(user)
    }

    /// ユーザーを削除する
    pub async fn delete_user(&self, id: Uuid) -> WebResult<()> {
        self.logger.info("DeleteUser", &[field("userID", &id)]);

        match self.repository.find_by_id(id).await {
            Ok(Some(_)) => {}
            _ => {
                self.logger
                    .warn("User not found for deletion", &[field("userID", &id)]);
                return Err(WebError::UserNotFound);
            }
        }

        match self.repository.delete(id).await {
            Ok(true) => {
                self.logger
                    .info("User deleted successfully", &[field("userID", &id)]);
                Ok(())
            }
            Ok(false) => Err(WebError::UserNotFound),
            Err(e) => {
                self.logger.error(
                    "Failed to delete user",
                    &[field("error", &e.to_string()), field("userID", &id)],
                );
                Err(e)
            }
        }
    }

    /// ユーザー一覧を取得する
    pub async fn list_users(&self, request: ListUsersRequest) -> WebResult<ListUsersResponse> {
        self.logger.info(
            "ListUsers",
            &[
                field("offset", &request.offset),
                field("limit", &request.limit),
            ],
        );

        let limit = normalize_limit(request.limit);
        let offset = request.offset;

        let total = self.repository.count().await.map_err(|e| {
            self.logger
                .error("Failed to get user count", &[field("error", &e.to_string())]);
            e
        })?;

        let users = self.repository.list(offset, limit).await.map_err(|e| {
            self.logger.error(
                "Failed to list users",
                &[
                    field("error", &e.to_string()),
                    field("offset", &offset),
                    field("limit", &limit),
                ],
            );
            e
        })?;

        self.logger.info(
            "Users listed successfully",
            &[field("total", &total), field("returned", &users.len())],
        );

        Ok(ListUsersResponse {
            users,
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
        })
    }

    async fn lookup(&self, id: Uuid, error_message: &str, missing_message: &str) -> WebResult<User> {
        match self.repository.find_by_id(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                self.logger.warn(missing_message, &[field("userID", &id)]);
                Err(WebError::UserNotFound)
            }
            Err(e) => {
                self.logger.error(
                    error_message,
                    &[field("error", &e.to_string()), field("userID", &id)],
                );
                Err(WebError::UserNotFound)
            }
        }
    }
}

/// 取得件数を正規化する（0以下はデフォルト、上限超過は上限）
pub fn normalize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else {
        limit.min(MAX_LIST_LIMIT)
    }
}
