use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::{Config, SecurityConfig};
use crate::constants::defaults;
use crate::entities::{devices, users};

pub mod migrator;
pub mod repositories;

pub use repositories::system_config::{PublicAnnouncement, VersionInfo};
pub use repositories::user::{NewUser, UserChanges};
pub use repositories::verification::CodePurpose;

/// Epoch millis, the wire format for every absolute timestamp in the API.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn device_repo(&self) -> repositories::device::DeviceRepository {
        repositories::device::DeviceRepository::new(self.conn.clone())
    }

    fn code_repo(&self) -> repositories::verification::VerificationCodeRepository {
        repositories::verification::VerificationCodeRepository::new(self.conn.clone())
    }

    fn system_config_repo(&self) -> repositories::system_config::SystemConfigRepository {
        repositories::system_config::SystemConfigRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_identifier(identifier).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_conflicting_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<users::Model>> {
        self.user_repo().get_conflicting(username, email).await
    }

    pub async fn create_user(
        &self,
        new_user: NewUser,
        security: &SecurityConfig,
    ) -> Result<users::Model> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn update_user(
        &self,
        id: i32,
        changes: UserChanges,
        security: &SecurityConfig,
    ) -> Result<Option<users::Model>> {
        self.user_repo().update(id, changes, security).await
    }

    pub async fn verify_password(&self, stored_hash: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(stored_hash, password).await
    }

    pub async fn increment_usage(
        &self,
        user: users::Model,
        model_type: &str,
        delta: i64,
    ) -> Result<users::Model> {
        self.user_repo().increment_usage(user, model_type, delta).await
    }

    pub async fn list_users(
        &self,
        page: u64,
        limit: u64,
        search: &str,
    ) -> Result<(Vec<users::Model>, u64)> {
        self.user_repo().list(page, limit, search).await
    }

    /// Deletes the account and every device bound to it.
    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        let deleted = self.user_repo().delete(id).await?;
        if deleted {
            self.device_repo().delete_for_user(id).await?;
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    pub async fn upsert_device(
        &self,
        user: &users::Model,
        machine_id: &str,
        machine_code: &str,
        cursor_token: &str,
        now_ms: i64,
    ) -> Result<devices::Model> {
        self.device_repo()
            .upsert(user, machine_id, machine_code, cursor_token, now_ms)
            .await
    }

    pub async fn get_device(&self, user_id: i32, machine_id: &str) -> Result<Option<devices::Model>> {
        self.device_repo().get(user_id, machine_id).await
    }

    pub async fn list_devices(&self, user_id: i32) -> Result<Vec<devices::Model>> {
        self.device_repo().list_for_user(user_id).await
    }

    pub async fn touch_device(&self, device: devices::Model, now_ms: i64) -> Result<devices::Model> {
        self.device_repo().touch(device, now_ms).await
    }

    pub async fn deactivate_device(&self, device: devices::Model) -> Result<devices::Model> {
        self.device_repo().deactivate(device).await
    }

    // ------------------------------------------------------------------
    // Verification codes
    // ------------------------------------------------------------------

    pub async fn issue_code(&self, username: &str, purpose: CodePurpose) -> Result<(String, u64)> {
        self.code_repo().issue(username, purpose).await
    }

    pub async fn verify_code(
        &self,
        username: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<bool> {
        self.code_repo().verify_and_consume(username, code, purpose).await
    }

    pub async fn purge_expired_codes(&self) -> Result<u64> {
        self.code_repo().purge_expired().await
    }

    // ------------------------------------------------------------------
    // System config
    // ------------------------------------------------------------------

    pub async fn get_version_info(&self) -> Result<Option<VersionInfo>> {
        self.system_config_repo().get_version().await
    }

    pub async fn set_version_info(&self, info: &VersionInfo) -> Result<()> {
        self.system_config_repo().set_version(info).await
    }

    pub async fn get_public_info(&self) -> Result<Option<PublicAnnouncement>> {
        self.system_config_repo().get_public_info().await
    }

    pub async fn set_public_info(&self, info: &PublicAnnouncement) -> Result<()> {
        self.system_config_repo().set_public_info(info).await
    }

    // ------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------

    /// Seeds the first admin account and the two well-known config records
    /// when they are absent. Idempotent; runs on every startup.
    pub async fn bootstrap(&self, config: &Config) -> Result<()> {
        if !self.user_repo().has_admin().await? {
            let admin = NewUser {
                username: config.bootstrap.admin_email.clone(),
                email: config.bootstrap.admin_email.clone(),
                password: config.bootstrap.admin_password.clone(),
                level: 999,
                total_count: 9999,
                expire_time: now_millis()
                    + defaults::ADMIN_LIFETIME_DAYS * 24 * 60 * 60 * 1000,
                is_admin: true,
            };
            self.create_user(admin, &config.security).await?;
            info!("Seeded bootstrap admin account");
        }

        if self.get_version_info().await?.is_none() {
            self.set_version_info(&VersionInfo {
                version: "1.0.0".to_string(),
                force_update: false,
                download_url: "https://example.com/download".to_string(),
                change_log: "Initial release".to_string(),
            })
            .await?;
        }

        if self.get_public_info().await?.is_none() {
            self.set_public_info(&PublicAnnouncement {
                kind: "info".to_string(),
                closeable: true,
                props: serde_json::json!({
                    "title": "Welcome",
                    "description": "Welcome to Cursor Pool"
                }),
                actions: Vec::new(),
            })
            .await?;
        }

        Ok(())
    }
}
