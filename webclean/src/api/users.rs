//! ユーザー管理API
//!
//! `/api/v1/users` 配下のCRUD操作。ログとエラーはリクエストコンテキスト経由で記録される。

use crate::audit::context::RequestContext;
use crate::common::error::WebError;
use crate::logging::field;
use crate::service::users::{
    CreateUserRequest as CreateUserCommand, ListUsersRequest, UpdateUserProfileRequest,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use crate::service::UserService;
use crate::types::User;
use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::AppError;

/// ユーザー作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// メールアドレス
    pub email: String,
    /// ユーザー名（3〜50文字）
    pub username: String,
    /// 表示名（1〜100文字）
    pub name: String,
}

/// プロフィール更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// 表示名（1〜100文字）
    pub name: String,
}

/// 一覧取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// 開始位置
    pub offset: Option<String>,
    /// 取得件数
    pub limit: Option<String>,
}

/// ユーザーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    /// ユーザーID
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// ユーザー名
    pub username: String,
    /// 表示名
    pub name: String,
    /// 作成日時（RFC 3339）
    pub created_at: String,
    /// 更新日時（RFC 3339）
    pub updated_at: String,
}

/// ユーザー一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    /// ユーザー一覧
    pub users: Vec<UserResponse>,
    /// 総件数
    pub total: i64,
    /// 開始位置
    pub offset: i64,
    /// 取得件数
    pub limit: i64,
    /// 続きがあるか
    pub has_more: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_string(),
            email: user.email,
            username: user.username,
            name: user.name,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

fn service(ctx: &RequestContext) -> UserService<SqlitePool> {
    UserService::new(ctx.db().clone(), ctx.logger())
}

fn parse_id(ctx: &RequestContext, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| {
        ctx.logger().warn(
            "Invalid user ID format",
            &[field("id", raw), field("error", &e.to_string())],
        );
        AppError(WebError::bad_request("invalid_id", "Invalid user ID format"))
    })
}

fn invalid_request(ctx: &RequestContext, operation: &str, message: String) -> AppError {
    ctx.logger().warn(
        &format!("Invalid request for {}", operation),
        &[field("error", &message)],
    );
    AppError(WebError::bad_request("invalid_request", message))
}

fn check_length(name: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!(
            "{} must be between {} and {} characters",
            name, min, max
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err("email must be a valid email address".to_string()),
    }
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        validate_email(&self.email)?;
        check_length("username", &self.username, 3, 50)?;
        check_length("name", &self.name, 1, 100)
    }
}

/// POST /api/v1/users - ユーザー作成
///
/// # Returns
/// * `201 Created` - 作成されたユーザー
/// * `400 Bad Request` - 入力不正
/// * `409 Conflict` - メールアドレスまたはユーザー名が重複
pub async fn create_user(
    ctx: RequestContext,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(request) = payload.map_err(|e| invalid_request(&ctx, "create user", e.body_text()))?;
    request
        .validate()
        .map_err(|message| invalid_request(&ctx, "create user", message))?;

    let user = service(&ctx)
        .create_user(CreateUserCommand {
            email: request.email,
            username: request.username,
            name: request.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/v1/users/:id - ユーザー取得
pub async fn get_user(
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&ctx, &id)?;
    let user = service(&ctx).get_user_by_id(id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/v1/users/:id - プロフィール更新
pub async fn update_user(
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&ctx, &id)?;
    let Json(request) = payload.map_err(|e| invalid_request(&ctx, "update user", e.body_text()))?;
    check_length("name", &request.name, 1, 100)
        .map_err(|message| invalid_request(&ctx, "update user", message))?;

    let user = service(&ctx)
        .update_user_profile(UpdateUserProfileRequest {
            id,
            name: request.name,
        })
        .await?;
    Ok(Json(user.into()))
}

/// DELETE /api/v1/users/:id - ユーザー削除
pub async fn delete_user(
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&ctx, &id)?;
    service(&ctx).delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users - ユーザー一覧取得
///
/// `offset`は0以上、`limit`は1〜100（デフォルト0/10）。
pub async fn list_users(
    ctx: RequestContext,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let offset_raw = query.offset.unwrap_or_else(|| "0".to_string());
    let offset = match offset_raw.parse::<i64>() {
        Ok(offset) if offset >= 0 => offset,
        _ => {
            ctx.logger()
                .warn("Invalid offset parameter", &[field("offset", &offset_raw)]);
            return Err(AppError(WebError::bad_request(
                "invalid_offset",
                "Offset must be a non-negative integer",
            )));
        }
    };

    let limit_raw = query
        .limit
        .unwrap_or_else(|| DEFAULT_LIST_LIMIT.to_string());
    let limit = match limit_raw.parse::<i64>() {
        Ok(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => limit,
        _ => {
            ctx.logger()
                .warn("Invalid limit parameter", &[field("limit", &limit_raw)]);
            return Err(AppError(WebError::bad_request(
                "invalid_limit",
                "Limit must be a positive integer between 1 and 100",
            )));
        }
    };

    let result = service(&ctx)
        .list_users(ListUsersRequest { offset, limit })
        .await?;

    Ok(Json(ListUsersResponse {
        users: result.users.into_iter().map(UserResponse::from).collect(),
        total: result.total,
        offset: result.offset,
        limit: result.limit,
        has_more: result.has_more,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = CreateUserRequest {
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            name: "Alice".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = CreateUserRequest {
            email: "alice.example.com".to_string(),
            ..valid_clone(&valid)
        };
        assert!(bad_email.validate().unwrap_err().contains("email"));

        let short_username = CreateUserRequest {
            username: "al".to_string(),
            ..valid_clone(&valid)
        };
        assert!(short_username.validate().unwrap_err().contains("username"));

        let long_name = CreateUserRequest {
            name: "x".repeat(101),
            ..valid_clone(&valid)
        };
        assert!(long_name.validate().unwrap_err().contains("name"));
    }

    fn valid_clone(request: &CreateUserRequest) -> CreateUserRequest {
        CreateUserRequest {
            email: request.email.clone(),
            username: request.username.clone(),
            name: request.name.clone(),
        }
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(check_length("username", "ゆーざ", 3, 50).is_ok());
        assert!(check_length("name", "", 1, 100).is_err());
    }

    #[test]
    fn test_user_response_uses_rfc3339() {
        let user = User::new("a@example.com", "anna", "Anna");
        let response = UserResponse::from(user.clone());
        assert_eq!(response.id, user.id.to_string());
        assert!(chrono::DateTime::parse_from_rfc3339(&response.created_at).is_ok());
    }
}
