use std::time::Duration;

use serde::Deserialize;

use crate::domain::api_key::{
    CredentialFormat, DEFAULT_PREFIX_LENGTH, DEFAULT_SCHEME, DEFAULT_SECRET_LENGTH,
};
use crate::infrastructure::observability::MetricsConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub api_key: ApiKeyConfig,
    pub validation: ValidationConfig,
    pub background: BackgroundConfig,
    pub reconciler: ReconcilerConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for draining background work at shutdown
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to postgres when a database url is configured, memory otherwise
    pub backend: Option<StorageBackend>,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[hidden]"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues operator tokens
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[hidden]"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub scheme: String,
    pub prefix_length: usize,
    pub secret_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enrichment_timeout_secs: u64,
    pub expiration_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub max_in_flight: usize,
    pub last_used_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub run_on_startup: bool,
    pub startup_page_size: u32,
    pub periodic_page_size: u32,
    pub interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace_secs: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            prefix_length: DEFAULT_PREFIX_LENGTH,
            secret_length: DEFAULT_SECRET_LENGTH,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enrichment_timeout_secs: 15,
            expiration_timeout_secs: 15,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 256,
            last_used_timeout_secs: 5,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            run_on_startup: true,
            startup_page_size: 500,
            periodic_page_size: 1000,
            interval_secs: 3600,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl ApiKeyConfig {
    pub fn credential_format(&self) -> CredentialFormat {
        CredentialFormat {
            scheme: self.scheme.clone(),
            prefix_length: self.prefix_length,
            secret_length: self.secret_length,
        }
    }
}

impl ValidationConfig {
    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    pub fn expiration_timeout(&self) -> Duration {
        Duration::from_secs(self.expiration_timeout_secs)
    }
}

impl BackgroundConfig {
    pub fn last_used_timeout(&self) -> Duration {
        Duration::from_secs(self.last_used_timeout_secs)
    }
}

impl ReconcilerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Backend to use, falling back on whether a database url is present
    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.backend.unwrap_or(match self.database.url {
            Some(_) => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        })
    }
}
