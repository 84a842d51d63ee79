use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::auth::Identity;
use super::{ApiError, ApiResponse, AppState};
use crate::services::{DeviceCredentials, DeviceDetails, DeviceSummary};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub machine_id: Option<String>,
    pub machine_code: Option<String>,
}

/// POST /device/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<Json<ApiResponse<DeviceCredentials>>, ApiError> {
    let (Some(machine_id), Some(machine_code)) = (req.machine_id, req.machine_code) else {
        return Err(ApiError::validation("Machine id and machine code are required"));
    };

    let credentials = state
        .devices()
        .register(&user, &machine_id, &machine_code)
        .await?;

    Ok(Json(ApiResponse::success("Device registered", credentials)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoQuery {
    pub machine_id: Option<String>,
}

/// GET /device/info?machineId=
pub async fn info(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Query(query): Query<DeviceInfoQuery>,
) -> Result<Json<ApiResponse<DeviceDetails>>, ApiError> {
    let machine_id = query
        .machine_id
        .ok_or_else(|| ApiError::validation("Machine id is required"))?;

    let details = state.devices().get_info(&user, &machine_id).await?;

    Ok(Json(ApiResponse::success("Device info retrieved", details)))
}

/// GET /device/list
pub async fn list(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
) -> Result<Json<ApiResponse<Vec<DeviceSummary>>>, ApiError> {
    let devices = state.devices().list(&user).await?;

    Ok(Json(ApiResponse::success("Device list retrieved", devices)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    pub machine_id: Option<String>,
}

/// PUT /device/deactivate
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(req): Json<DeactivateRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let machine_id = req
        .machine_id
        .ok_or_else(|| ApiError::validation("Machine id is required"))?;

    let machine_id = state.devices().deactivate(&user, &machine_id).await?;

    Ok(Json(ApiResponse::success(
        "Device deactivated",
        json!({ "machineId": machine_id }),
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetMachineIdRequest {
    pub machine_id: Option<String>,
}

/// POST /device/reset_machine_id
///
/// Hands out fresh identifiers and a credential without touching any stored
/// binding; the client follows up with a normal register call.
pub async fn reset_machine_id(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(req): Json<ResetMachineIdRequest>,
) -> Result<Json<ApiResponse<DeviceCredentials>>, ApiError> {
    let credentials = state.devices().reset_machine_id(&user, req.machine_id);

    Ok(Json(ApiResponse::success("Machine id reset", credentials)))
}
