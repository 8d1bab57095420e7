//! License Service API
//!
//! Issues and validates software licenses for agents:
//! - License validation with device/user binding and metadata enrichment
//! - Lazy and scheduled expiration of overdue licenses
//! - API key authentication for agents, bearer tokens for operators

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::StorageBackend;
use domain::{ApiKeyRepository, LicenseRepository};
use infrastructure::{
    api_key::{
        ApiKeyAuthenticator, ApiKeyGenerator, ApiKeyService, InMemoryApiKeyRepository,
        PostgresApiKeyRepository,
    },
    auth::{JwtConfig, JwtService},
    background::BackgroundTasks,
    license::{
        ExpirationReconciler, InMemoryLicenseRepository, LicenseService, LicenseValidator,
        PostgresLicenseRepository,
    },
    storage::{self, PostgresConfig},
};
use rand::Rng;
use tracing::info;

/// The two stores every service is built on
#[derive(Clone)]
pub struct Repositories {
    pub licenses: Arc<dyn LicenseRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            licenses: Arc::new(InMemoryLicenseRepository::new()),
            api_keys: Arc::new(InMemoryApiKeyRepository::new()),
        }
    }

    /// Open the configured backend, running migrations for postgres when enabled
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let backend = config.storage_backend();
        info!(backend = ?backend, "Storage backend selected");

        match backend {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::Postgres => {
                let url = config.database.url.clone().ok_or_else(|| {
                    anyhow::anyhow!("database.url (or DATABASE_URL) is required for postgres storage")
                })?;

                let pool = storage::connect(
                    &PostgresConfig::new(url)
                        .with_max_connections(config.database.max_connections)
                        .with_acquire_timeout(config.database.acquire_timeout_secs),
                )
                .await?;
                info!("PostgreSQL connection established");

                if config.database.run_migrations {
                    storage::run_migrations(&pool).await?;
                    info!("Database migrations applied");
                }

                Ok(Self {
                    licenses: Arc::new(PostgresLicenseRepository::new(pool.clone())),
                    api_keys: Arc::new(PostgresApiKeyRepository::new(pool)),
                })
            }
        }
    }
}

/// Everything the binary needs besides the HTTP state
pub struct AppContext {
    pub state: AppState,
    pub reconciler: Arc<ExpirationReconciler>,
    pub background: BackgroundTasks,
}

/// Connect the configured stores and wire all services
pub async fn create_app_context_with_config(config: &AppConfig) -> anyhow::Result<AppContext> {
    let repositories = Repositories::from_config(config).await?;
    Ok(create_app_context(config, repositories))
}

/// Wire services over already-opened stores
pub fn create_app_context(config: &AppConfig, repositories: Repositories) -> AppContext {
    let background = BackgroundTasks::new(config.background.max_in_flight);
    let format = config.api_key.credential_format();

    let license_service = Arc::new(LicenseService::new(repositories.licenses.clone()));

    let validator = Arc::new(
        LicenseValidator::new(repositories.licenses.clone(), background.clone()).with_timeouts(
            config.validation.expiration_timeout(),
            config.validation.enrichment_timeout(),
        ),
    );

    let reconciler = Arc::new(
        ExpirationReconciler::new(repositories.licenses).with_page_sizes(
            config.reconciler.startup_page_size,
            config.reconciler.periodic_page_size,
        ),
    );

    let api_key_service = Arc::new(
        ApiKeyService::new(repositories.api_keys.clone())
            .with_generator(ApiKeyGenerator::new(format.clone())),
    );

    let authenticator = Arc::new(
        ApiKeyAuthenticator::new(repositories.api_keys, background.clone())
            .with_format(format)
            .with_last_used_timeout(config.background.last_used_timeout()),
    );

    let jwt_service = Arc::new(create_jwt_service(config));

    AppContext {
        state: AppState::new(
            license_service,
            validator,
            api_key_service,
            authenticator,
            jwt_service,
        ),
        reconciler,
        background,
    }
}

fn create_jwt_service(config: &AppConfig) -> JwtService {
    let secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!(
            "No auth.jwt_secret configured. Generating random secret. \
            Operator tokens from the identity provider will be rejected."
        );
        generate_random_secret()
    });

    JwtService::new(
        JwtConfig::new(secret)
            .with_issuer(config.auth.jwt_issuer.clone())
            .with_audience(config.auth.jwt_audience.clone()),
    )
}

fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
