use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{DeviceService, LogMailer, Mailer, SeaOrmDeviceService, SmtpMailer, TokenService};

/// Long-lived application services, built once at startup and shared by the
/// HTTP layer and background tasks.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub mailer: Arc<dyn Mailer>,

    pub devices: Arc<dyn DeviceService>,
}

impl SharedState {
    /// Connects the store, runs migrations and bootstrap seeding, and wires
    /// up the domain services.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        store.bootstrap(&config).await?;

        let tokens = Arc::new(TokenService::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_lifetime_days,
        ));

        let mailer: Arc<dyn Mailer> = if config.smtp.username.is_empty() {
            tracing::warn!("No SMTP credentials configured; verification codes will be logged");
            Arc::new(LogMailer)
        } else {
            Arc::new(SmtpMailer::new(&config.smtp)?)
        };

        let devices: Arc<dyn DeviceService> =
            Arc::new(SeaOrmDeviceService::new(store.clone(), tokens.clone()));

        Ok(Self {
            config,
            store,
            tokens,
            mailer,
            devices,
        })
    }
}
