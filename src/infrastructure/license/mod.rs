//! License infrastructure: stores, validation, expiration sweeps and administration

mod in_memory;
mod postgres_repository;
mod reconciler;
mod service;
mod validator;

pub use in_memory::InMemoryLicenseRepository;
pub use postgres_repository::PostgresLicenseRepository;
pub use reconciler::{
    ExpirationReconciler, SweepReport, SweepTrigger, DEFAULT_PERIODIC_PAGE_SIZE,
    DEFAULT_STARTUP_PAGE_SIZE,
};
pub use service::{
    clamp_limit, CreateLicenseRequest, LicenseService, UpdateLicenseRequest, EXPIRING_SOON_DAYS,
};
pub use validator::{LicenseValidator, DEFAULT_ENRICHMENT_TIMEOUT, DEFAULT_EXPIRATION_TIMEOUT};
