use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::db::now_rfc3339;
use crate::entities::system_config;

const VERSION_KEY: &str = "version";
const PUBLIC_INFO_KEY: &str = "publicInfo";

/// Client application release metadata, writable by admins only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub force_update: bool,
    pub download_url: String,
    #[serde(default)]
    pub change_log: String,
}

/// Announcement banner shown by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAnnouncement {
    #[serde(rename = "type")]
    pub kind: String,
    pub closeable: bool,
    pub props: serde_json::Value,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

pub struct SystemConfigRepository {
    conn: DatabaseConnection,
}

impl SystemConfigRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_version(&self) -> Result<Option<VersionInfo>> {
        self.get_typed(VERSION_KEY).await
    }

    pub async fn set_version(&self, info: &VersionInfo) -> Result<()> {
        self.upsert(VERSION_KEY, serde_json::to_value(info)?, "Application version info")
            .await
    }

    pub async fn get_public_info(&self) -> Result<Option<PublicAnnouncement>> {
        self.get_typed(PUBLIC_INFO_KEY).await
    }

    pub async fn set_public_info(&self, info: &PublicAnnouncement) -> Result<()> {
        self.upsert(PUBLIC_INFO_KEY, serde_json::to_value(info)?, "System announcement")
            .await
    }

    async fn get_typed<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let record = system_config::Entity::find()
            .filter(system_config::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query system config")?;

        record
            .map(|r| serde_json::from_value(r.value).context("Malformed system config value"))
            .transpose()
    }

    async fn upsert(&self, key: &str, value: serde_json::Value, description: &str) -> Result<()> {
        let model = system_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            description: Set(description.to_string()),
            updated_at: Set(now_rfc3339()),
            ..Default::default()
        };

        system_config::Entity::insert(model)
            .on_conflict(
                OnConflict::column(system_config::Column::Key)
                    .update_columns([
                        system_config::Column::Value,
                        system_config::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert system config")?;

        Ok(())
    }
}
