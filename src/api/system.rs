use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::{PublicAnnouncement, VersionInfo};

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to the Cursor Pool API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let database = match state.store().ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!("Database ping failed: {}", e);
            "error"
        }
    };

    Ok(Json(ApiResponse::success(
        "Health check",
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSeconds": state.start_time.elapsed().as_secs(),
            "database": database,
        }),
    )))
}

/// GET /system/version
pub async fn get_version(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<VersionInfo>>, ApiError> {
    let info = state
        .store()
        .get_version_info()
        .await?
        .ok_or_else(|| ApiError::NotFound("Version info is not configured".to_string()))?;

    Ok(Json(ApiResponse::success("Version info retrieved", info)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVersionRequest {
    pub version: Option<String>,
    #[serde(default)]
    pub force_update: bool,
    pub download_url: Option<String>,
    pub change_log: Option<String>,
}

/// PUT /system/version (admin)
pub async fn put_version(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateVersionRequest>,
) -> Result<Json<ApiResponse<VersionInfo>>, ApiError> {
    let (Some(version), Some(download_url)) = (req.version, req.download_url) else {
        return Err(ApiError::validation("Version and download URL are required"));
    };

    let info = VersionInfo {
        version,
        force_update: req.force_update,
        download_url,
        change_log: req.change_log.unwrap_or_default(),
    };

    state.store().set_version_info(&info).await?;

    Ok(Json(ApiResponse::success("Version info updated", info)))
}

/// GET /system/public_info
pub async fn get_public_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PublicAnnouncement>>, ApiError> {
    let info = state
        .store()
        .get_public_info()
        .await?
        .ok_or_else(|| ApiError::NotFound("Announcement is not configured".to_string()))?;

    Ok(Json(ApiResponse::success("Announcement retrieved", info)))
}

#[derive(Deserialize)]
pub struct UpdatePublicInfoRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub closeable: bool,
    pub props: Option<serde_json::Value>,
    pub actions: Option<Vec<serde_json::Value>>,
}

/// PUT /system/public_info (admin)
pub async fn put_public_info(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePublicInfoRequest>,
) -> Result<Json<ApiResponse<PublicAnnouncement>>, ApiError> {
    let (Some(kind), Some(props)) = (req.kind, req.props) else {
        return Err(ApiError::validation("Announcement type and props are required"));
    };

    let info = PublicAnnouncement {
        kind,
        closeable: req.closeable,
        props,
        actions: req.actions.unwrap_or_default(),
    };

    state.store().set_public_info(&info).await?;

    Ok(Json(ApiResponse::success("Announcement updated", info)))
}
