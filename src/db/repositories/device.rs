use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::db::now_rfc3339;
use crate::entities::{devices, users};

pub struct DeviceRepository {
    conn: DatabaseConnection,
}

impl DeviceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Upsert by the (`user_id`, `machine_id`) natural key. The unique index
    /// arbitrates concurrent registrations: a loser's insert turns into the
    /// update branch inside the database, so exactly one row ever exists per
    /// pair and the last writer's `machine_code` and token win.
    pub async fn upsert(
        &self,
        user: &users::Model,
        machine_id: &str,
        machine_code: &str,
        cursor_token: &str,
        now_ms: i64,
    ) -> Result<devices::Model> {
        let now = now_rfc3339();
        let model = devices::ActiveModel {
            user_id: Set(user.id),
            email: Set(user.email.clone()),
            machine_id: Set(machine_id.to_string()),
            machine_code: Set(machine_code.to_string()),
            cursor_token: Set(cursor_token.to_string()),
            is_active: Set(true),
            last_used: Set(now_ms),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        devices::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([devices::Column::UserId, devices::Column::MachineId])
                    .update_columns([
                        devices::Column::MachineCode,
                        devices::Column::CursorToken,
                        devices::Column::IsActive,
                        devices::Column::LastUsed,
                        devices::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(&self.conn)
            .await
            .context("Failed to upsert device")
    }

    pub async fn get(&self, user_id: i32, machine_id: &str) -> Result<Option<devices::Model>> {
        devices::Entity::find()
            .filter(devices::Column::UserId.eq(user_id))
            .filter(devices::Column::MachineId.eq(machine_id))
            .one(&self.conn)
            .await
            .context("Failed to query device")
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<devices::Model>> {
        devices::Entity::find()
            .filter(devices::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to list devices")
    }

    /// Refreshes `last_used` on an info lookup.
    pub async fn touch(&self, device: devices::Model, now_ms: i64) -> Result<devices::Model> {
        let mut active: devices::ActiveModel = device.into();
        active.last_used = Set(now_ms);
        active.updated_at = Set(now_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to touch device")
    }

    pub async fn deactivate(&self, device: devices::Model) -> Result<devices::Model> {
        let mut active: devices::ActiveModel = device.into();
        active.is_active = Set(false);
        active.updated_at = Set(now_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to deactivate device")
    }

    /// Cascade used by admin user deletion.
    pub async fn delete_for_user(&self, user_id: i32) -> Result<u64> {
        let result = devices::Entity::delete_many()
            .filter(devices::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete devices for user")?;

        Ok(result.rows_affected)
    }
}
