use serde::Serialize;

use crate::db::now_millis;
use crate::entities::users;

/// Uniform response envelope. `data` is always present on the wire, `null`
/// when an operation has nothing to return.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Success with an explicit `data: null`.
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: None,
        }
    }
}

/// Sanitized user projection; the password hash never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub level: i32,
    pub total_count: i64,
    pub used_count: i64,
    pub expire_time: i64,
    pub credits: i64,
    pub usage: serde_json::Value,
    pub is_admin: bool,
    pub is_expired: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserDto {
    #[must_use]
    pub fn from_model(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            level: user.level,
            total_count: user.total_count,
            used_count: user.used_count,
            expire_time: user.expire_time,
            credits: user.credits,
            usage: user.usage.clone(),
            is_admin: user.is_admin,
            is_expired: now_millis() > user.expire_time,
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
    pub pagination: Pagination,
}
