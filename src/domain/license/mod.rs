//! License domain: entity, validation verdicts and repository contract

mod entity;
pub mod metadata;
mod repository;
mod verdict;

pub use entity::{License, LicenseId, LicenseStatus};
pub use metadata::AgentMetadata;
pub use repository::{
    DashboardSummary, ExpiringLicense, LicensePage, LicenseRepository, ListParams, SortField,
    SortOrder, DEFAULT_PAGE_LIMIT, MAX_OFFSET, MAX_PAGE_LIMIT,
};
pub use verdict::{ValidationReason, ValidationRequest, ValidationResult};

#[cfg(test)]
pub use repository::MockLicenseRepository;
