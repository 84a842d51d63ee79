//! `SeaORM` implementation of the `DeviceService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use crate::db::{Store, now_millis};
use crate::entities::users;
use crate::services::device_service::{
    DeviceCredentials, DeviceDetails, DeviceError, DeviceService, DeviceSummary,
};
use crate::services::token::TokenService;

pub struct SeaOrmDeviceService {
    store: Store,
    tokens: Arc<TokenService>,
}

impl SeaOrmDeviceService {
    #[must_use]
    pub const fn new(store: Store, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }
}

#[async_trait]
impl DeviceService for SeaOrmDeviceService {
    async fn register(
        &self,
        user: &users::Model,
        machine_id: &str,
        machine_code: &str,
    ) -> Result<DeviceCredentials, DeviceError> {
        let now = now_millis();
        let cursor_token = self.tokens.issue_cursor_token(user.id, machine_id, now);

        let device = self
            .store
            .upsert_device(user, machine_id, machine_code, &cursor_token, now)
            .await?;

        Ok(DeviceCredentials {
            machine_id: device.machine_id,
            machine_code: device.machine_code,
            cursor_token: device.cursor_token,
            current_account: device.email,
        })
    }

    async fn get_info(
        &self,
        user: &users::Model,
        machine_id: &str,
    ) -> Result<DeviceDetails, DeviceError> {
        let device = self
            .store
            .get_device(user.id, machine_id)
            .await?
            .ok_or(DeviceError::NotFound)?;

        let device = self.store.touch_device(device, now_millis()).await?;

        Ok(DeviceDetails {
            credentials: DeviceCredentials {
                machine_id: device.machine_id,
                machine_code: device.machine_code,
                cursor_token: device.cursor_token,
                current_account: device.email,
            },
            is_active: device.is_active,
            last_used: device.last_used,
        })
    }

    async fn list(&self, user: &users::Model) -> Result<Vec<DeviceSummary>, DeviceError> {
        let devices = self.store.list_devices(user.id).await?;

        Ok(devices
            .into_iter()
            .map(|d| DeviceSummary {
                id: d.id,
                machine_id: d.machine_id,
                machine_code: d.machine_code,
                is_active: d.is_active,
                last_used: d.last_used,
                created_at: d.created_at,
            })
            .collect())
    }

    async fn deactivate(
        &self,
        user: &users::Model,
        machine_id: &str,
    ) -> Result<String, DeviceError> {
        let device = self
            .store
            .get_device(user.id, machine_id)
            .await?
            .ok_or(DeviceError::NotFound)?;

        let device = self.store.deactivate_device(device).await?;
        Ok(device.machine_id)
    }

    fn reset_machine_id(
        &self,
        user: &users::Model,
        machine_id: Option<String>,
    ) -> DeviceCredentials {
        let machine_id = machine_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let machine_code = generate_machine_code();
        let cursor_token = self
            .tokens
            .issue_cursor_token(user.id, &machine_id, now_millis());

        // No stored binding is updated here; the client registers the new
        // identifiers through the normal register path.
        DeviceCredentials {
            machine_id,
            machine_code,
            cursor_token,
            current_account: user.email.clone(),
        }
    }
}

/// 16 random bytes, hex-encoded, matching the client's own code format.
#[must_use]
pub fn generate_machine_code() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_code_format() {
        let code = generate_machine_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_machine_codes_are_random() {
        assert_ne!(generate_machine_code(), generate_machine_code());
    }
}
