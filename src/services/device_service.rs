//! Domain service for device bindings and credential issuance.
//!
//! Owns the one-active-binding-per-(user, machine) invariant. Registration is
//! an upsert by natural key: the store's unique index decides races, never an
//! application-level read-then-insert.

use serde::Serialize;
use thiserror::Error;

use crate::entities::users;

/// Errors specific to device registry operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for DeviceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for DeviceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public projection returned by register and reset operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCredentials {
    pub machine_id: String,
    pub machine_code: String,
    pub cursor_token: String,
    pub current_account: String,
}

/// Credentials plus binding state, returned by info lookups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetails {
    #[serde(flatten)]
    pub credentials: DeviceCredentials,
    pub is_active: bool,
    pub last_used: i64,
}

/// Reduced row used by the device list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: i32,
    pub machine_id: String,
    pub machine_code: String,
    pub is_active: bool,
    pub last_used: i64,
    pub created_at: String,
}

/// Domain service trait for the device registry.
#[async_trait::async_trait]
pub trait DeviceService: Send + Sync {
    /// Registers a machine for `user`, reissuing the credential and
    /// reactivating the binding when the machine is already known.
    async fn register(
        &self,
        user: &users::Model,
        machine_id: &str,
        machine_code: &str,
    ) -> Result<DeviceCredentials, DeviceError>;

    /// Looks up a binding, bumping its `last_used` as a side effect.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotFound`] when no binding exists.
    async fn get_info(
        &self,
        user: &users::Model,
        machine_id: &str,
    ) -> Result<DeviceDetails, DeviceError>;

    /// Lists every binding owned by `user`.
    async fn list(&self, user: &users::Model) -> Result<Vec<DeviceSummary>, DeviceError>;

    /// Marks a binding inactive. Register is the only reactivation path.
    async fn deactivate(
        &self,
        user: &users::Model,
        machine_id: &str,
    ) -> Result<String, DeviceError>;

    /// Generates fresh identifiers and a credential without touching stored
    /// bindings; the client re-registers separately.
    fn reset_machine_id(
        &self,
        user: &users::Model,
        machine_id: Option<String>,
    ) -> DeviceCredentials;
}
