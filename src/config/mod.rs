//! Application configuration

mod app_config;

pub use app_config::{
    ApiKeyConfig, AppConfig, AuthConfig, BackgroundConfig, DatabaseConfig, LogFormat,
    LoggingConfig, ReconcilerConfig, ServerConfig, StorageBackend, StorageConfig,
    ValidationConfig,
};
