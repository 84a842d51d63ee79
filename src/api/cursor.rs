use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::auth::Identity;
use super::{ApiError, ApiResponse, AppState};
use crate::constants::{MODEL_TIERS, TOKENS_PER_REQUEST};
use crate::db::now_rfc3339;
use crate::db::repositories::user::usage_requests;

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// GET /cursor/user_info?token=
///
/// OIDC-shaped profile consumed by the client application. The `token` query
/// parameter is required here even though the auth gate accepts other
/// sources.
pub async fn user_info(
    Identity(user): Identity,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if query.token.is_none() {
        return Err(ApiError::validation("Token is required"));
    }

    Ok(Json(ApiResponse::success(
        "Cursor user info retrieved",
        json!({
            "email": user.email,
            "email_verified": true,
            "name": user.username,
            "sub": format!("user_{}", user.id),
            "updatedAt": now_rfc3339(),
            "picture": null,
        }),
    )))
}

/// GET /cursor/usage?token=
///
/// Per-tier counters from the user's usage document, combined with the
/// static tier ceilings. Ceilings do not scale with the account's own quota.
pub async fn usage(
    Identity(user): Identity,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if query.token.is_none() {
        return Err(ApiError::validation("Token is required"));
    }

    let mut report = serde_json::Map::new();
    for tier in MODEL_TIERS {
        let requests = usage_requests(&user.usage, tier.name);
        report.insert(
            tier.name.to_string(),
            json!({
                "numRequests": requests,
                "numRequestsTotal": tier.num_requests_total,
                "numTokens": requests * TOKENS_PER_REQUEST,
                "maxRequestUsage": tier.max_request_usage,
                "maxTokenUsage": tier.max_token_usage,
            }),
        );
    }
    report.insert("startOfMonth".to_string(), json!(start_of_month()));

    Ok(Json(ApiResponse::success(
        "Usage retrieved",
        serde_json::Value::Object(report),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsageRequest {
    pub model_type: Option<String>,
    pub increment: Option<i64>,
}

/// POST /cursor/update_usage
pub async fn update_usage(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(req): Json<UpdateUsageRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (Some(model_type), Some(increment)) = (req.model_type, req.increment) else {
        return Err(ApiError::validation("Model type and increment are required"));
    };

    let updated = state
        .store()
        .increment_usage(user, &model_type, increment)
        .await?;

    Ok(Json(ApiResponse::success("Usage updated", updated.usage)))
}

/// Start of the current calendar month, UTC.
fn start_of_month() -> String {
    let now = chrono::Utc::now();
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or_else(|| now.to_rfc3339(), |dt| dt.and_utc().to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_month_is_first_day_midnight() {
        let value = start_of_month();
        let parsed = chrono::DateTime::parse_from_rfc3339(&value).unwrap();
        assert_eq!(parsed.day(), 1);
        assert_eq!(parsed.time(), chrono::NaiveTime::MIN);
    }
}
