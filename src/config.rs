use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub smtp: SmtpConfig,

    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_url: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/cursor-pool.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens, also keys the device
    /// credential HMAC. Must be set; an empty secret fails validation.
    pub jwt_secret: String,

    /// Session token lifetime in days.
    pub token_lifetime_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,

    pub port: u16,

    pub username: String,

    pub password: String,

    /// Sender display name on verification mails.
    pub from_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_name: "Cursor Pool".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Seeded as the first admin account when no admin exists.
    pub admin_email: String,

    pub admin_password: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@example.com".to_string(),
            admin_password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            smtp: SmtpConfig::default(),
            bootstrap: BootstrapConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets and deployment knobs come from the environment when present,
    /// so the config file never has to hold credentials.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CURSOR_POOL_DATABASE_URL") {
            self.general.database_url = url;
        }
        if let Ok(secret) = std::env::var("CURSOR_POOL_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(password) = std::env::var("CURSOR_POOL_SMTP_PASSWORD") {
            self.smtp.password = password;
        }
        if let Ok(email) = std::env::var("CURSOR_POOL_ADMIN_EMAIL") {
            self.bootstrap.admin_email = email;
        }
        if let Ok(password) = std::env::var("CURSOR_POOL_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = password;
        }
        if let Ok(port) = std::env::var("CURSOR_POOL_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cursor-pool").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!(
                "Token signing secret is not configured (set CURSOR_POOL_JWT_SECRET or [auth] jwt_secret)"
            );
        }

        if self.auth.token_lifetime_days <= 0 {
            anyhow::bail!("Token lifetime must be positive");
        }

        if self.bootstrap.admin_password.is_empty() {
            anyhow::bail!(
                "Bootstrap admin password is not configured (set CURSOR_POOL_ADMIN_PASSWORD or [bootstrap] admin_password)"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_lifetime_days, 30);
        assert_eq!(config.security.argon2_memory_cost_kib, 8192);
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [auth]
            jwt_secret = "s3cret"
            token_lifetime_days = 7
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_lifetime_days, 7);

        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validation_rejects_missing_secret() {
        let mut config = Config::default();
        config.bootstrap.admin_password = "hunter2".to_string();
        assert!(config.validate().is_err());

        config.auth.jwt_secret = "s3cret".to_string();
        assert!(config.validate().is_ok());
    }
}
