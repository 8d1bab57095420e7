//! API Key infrastructure implementations
//!
//! Key generation, storage, authentication and administration.

mod authenticator;
mod generator;
mod in_memory;
mod postgres_repository;
mod service;

pub use authenticator::{ApiKeyAuthenticator, DEFAULT_LAST_USED_TIMEOUT};
pub use generator::{hash_key, verify_key, ApiKeyGenerator, GeneratedApiKey};
pub use in_memory::InMemoryApiKeyRepository;
pub use postgres_repository::PostgresApiKeyRepository;
pub use service::{ApiKeyService, CreateApiKeyResult};
