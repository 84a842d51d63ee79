use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, Pagination, UserDto, UserListDto};
use crate::constants::defaults;
use crate::db::{NewUser, UserChanges, now_millis};
use crate::services::DeviceSummary;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ApiResponse<UserListDto>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let search = query.search.unwrap_or_default();

    let (users, total) = state.store().list_users(page, limit, &search).await?;

    Ok(Json(ApiResponse::success(
        "User list retrieved",
        UserListDto {
            users: users.iter().map(UserDto::from_model).collect(),
            pagination: Pagination {
                total,
                page,
                limit,
                pages: total.div_ceil(limit),
            },
        },
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub level: Option<i32>,
    pub total_count: Option<i64>,
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let (Some(username), Some(email), Some(password)) = (req.username, req.email, req.password)
    else {
        return Err(ApiError::validation("Username, email and password are required"));
    };

    if state
        .store()
        .get_conflicting_user(&username, &email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Username or email already exists".to_string(),
        ));
    }

    let user = state
        .store()
        .create_user(
            NewUser {
                username,
                email,
                password,
                level: req.level.unwrap_or(0),
                total_count: req.total_count.unwrap_or(defaults::TOTAL_COUNT),
                expire_time: now_millis() + defaults::ACCOUNT_LIFETIME_DAYS * MILLIS_PER_DAY,
                is_admin: false,
            },
            &state.config().security,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User created", UserDto::from_model(&user))),
    ))
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = state
        .store()
        .get_user(id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let devices: Vec<DeviceSummary> = state
        .store()
        .list_devices(id)
        .await?
        .into_iter()
        .map(|d| DeviceSummary {
            id: d.id,
            machine_id: d.machine_id,
            machine_code: d.machine_code,
            is_active: d.is_active,
            last_used: d.last_used,
            created_at: d.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(
        "User details retrieved",
        json!({
            "user": UserDto::from_model(&user),
            "devices": devices,
        }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub level: Option<i32>,
    pub total_count: Option<i64>,
    pub expire_time: Option<i64>,
    pub credits: Option<i64>,
    pub is_admin: Option<bool>,
}

/// PUT /admin/users/{id}
///
/// Partial update; a present password is re-hashed by the store, every other
/// field is written through as-is.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let changes = UserChanges {
        username: req.username,
        email: req.email,
        password: req.password,
        level: req.level,
        total_count: req.total_count,
        expire_time: req.expire_time,
        credits: req.credits,
        is_admin: req.is_admin,
    };

    let user = state
        .store()
        .update_user(id, changes, &state.config().security)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(ApiResponse::success("User updated", UserDto::from_model(&user))))
}

/// DELETE /admin/users/{id}
///
/// Removes the account and every device bound to it.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = state.store().delete_user(id).await?;
    if !deleted {
        return Err(ApiError::user_not_found());
    }

    Ok(Json(ApiResponse::success_empty("User deleted")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResetPasswordRequest {
    pub new_password: Option<String>,
}

/// POST /admin/users/{id}/reset-password
pub async fn reset_user_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<AdminResetPasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let new_password = req
        .new_password
        .ok_or_else(|| ApiError::validation("New password is required"))?;

    state
        .store()
        .update_user(
            id,
            UserChanges {
                password: Some(new_password),
                ..Default::default()
            },
            &state.config().security,
        )
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(ApiResponse::success_empty("Password reset")))
}
