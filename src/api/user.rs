use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::auth::Identity;
use super::{ApiError, ApiResponse, AppState, UserDto};
use crate::db::{CodePurpose, UserChanges};

#[derive(Deserialize)]
pub struct CheckUserRequest {
    pub username: Option<String>,
}

/// POST /user/check
///
/// Pre-login probe: does this account exist, and will login ask for a code.
pub async fn check_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckUserRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let username = req
        .username
        .ok_or_else(|| ApiError::validation("Username is required"))?;

    let user = state.store().get_user_by_identifier(&username).await?;
    let exists = user.is_some();

    Ok(Json(ApiResponse::success(
        "User check completed",
        json!({
            "exists": exists,
            "needCode": exists,
        }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    pub username: Option<String>,
    #[serde(default)]
    pub is_reset_password: bool,
}

/// POST /user/send_code
pub async fn send_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendCodeRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let username = req
        .username
        .ok_or_else(|| ApiError::validation("Username is required"))?;

    let user = state
        .store()
        .get_user_by_identifier(&username)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let purpose = if req.is_reset_password {
        CodePurpose::ResetPassword
    } else {
        CodePurpose::Login
    };

    // Codes are keyed by the canonical username, whichever identifier the
    // client logged in with.
    let (code, expire_in) = state.store().issue_code(&user.username, purpose).await?;
    state
        .mailer()
        .send_verification_code(&user.email, &code, purpose)
        .await?;

    Ok(Json(ApiResponse::success(
        "Verification code sent",
        json!({ "expireIn": expire_in }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub sms_code: Option<String>,
}

/// POST /user/login
///
/// Unknown accounts are 404 before the password is ever checked; accounts
/// above level 0 must also present a one-time emailed code, consumed here.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::validation("Username and password are required"));
    };

    let user = state
        .store()
        .get_user_by_identifier(&username)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if user.level > 0 {
        let sms_code = req
            .sms_code
            .ok_or_else(|| ApiError::validation("Verification code is required"))?;

        let valid = state
            .store()
            .verify_code(&user.username, &sms_code, CodePurpose::Login)
            .await?;
        if !valid {
            return Err(ApiError::validation("Verification code is invalid or expired"));
        }
    }

    let matches = state
        .store()
        .verify_password(&user.password_hash, &password)
        .await?;
    if !matches {
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    let token = state.tokens().sign_session(user.id)?;

    Ok(Json(ApiResponse::success(
        "Login successful",
        json!({ "apiKey": token }),
    )))
}

/// GET /user/info
pub async fn user_info(
    Identity(user): Identity,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    Ok(Json(ApiResponse::success(
        "User info retrieved",
        UserDto::from_model(&user),
    )))
}

/// GET /user/account
///
/// The account-level credential is keyed by the user id alone; it does not
/// vary per device or per issuance.
pub async fn account(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let token = state.tokens().issue_account_token(user.id);

    Ok(Json(ApiResponse::success(
        "Account info retrieved",
        json!({
            "email": user.email,
            "userId": user.id,
            "token": token,
        }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /user/change_password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (Some(old_password), Some(new_password)) = (req.old_password, req.new_password) else {
        return Err(ApiError::validation("Old and new passwords are required"));
    };

    let matches = state
        .store()
        .verify_password(&user.password_hash, &old_password)
        .await?;
    if !matches {
        return Err(ApiError::Unauthorized("Incorrect old password".to_string()));
    }

    state
        .store()
        .update_user(
            user.id,
            UserChanges {
                password: Some(new_password),
                ..Default::default()
            },
            &state.config().security,
        )
        .await?;

    let token = state.tokens().sign_session(user.id)?;

    Ok(Json(ApiResponse::success(
        "Password changed",
        json!({ "apiKey": token }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub sms_code: Option<String>,
    pub new_password: Option<String>,
}

/// POST /user/reset_password
///
/// Public endpoint; the emailed code is the proof of ownership.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (Some(email), Some(sms_code), Some(new_password)) =
        (req.email, req.sms_code, req.new_password)
    else {
        return Err(ApiError::validation(
            "Email, verification code and new password are required",
        ));
    };

    let user = state
        .store()
        .get_user_by_email(&email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let valid = state
        .store()
        .verify_code(&user.username, &sms_code, CodePurpose::ResetPassword)
        .await?;
    if !valid {
        return Err(ApiError::validation("Verification code is invalid or expired"));
    }

    state
        .store()
        .update_user(
            user.id,
            UserChanges {
                password: Some(new_password),
                ..Default::default()
            },
            &state.config().security,
        )
        .await?;

    let token = state.tokens().sign_session(user.id)?;

    Ok(Json(ApiResponse::success(
        "Password reset",
        json!({ "apiKey": token }),
    )))
}
