//! Expiration reconciler
//!
//! Pages through active licenses in order of soonest expiry and moves every
//! overdue one to `expired`, using the same idempotent status write as the
//! validator. Rows that fail to update are logged and skipped.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::license::{LicenseRepository, LicenseStatus, ListParams};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_expirations, ExpirationSource};

pub const DEFAULT_STARTUP_PAGE_SIZE: u32 = 500;
pub const DEFAULT_PERIODIC_PAGE_SIZE: u32 = 1000;

/// What started a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Startup,
    Scheduled,
}

impl SweepTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Scheduled => "scheduled",
        }
    }

    fn source(&self) -> ExpirationSource {
        match self {
            Self::Startup => ExpirationSource::Startup,
            Self::Scheduled => ExpirationSource::Scheduled,
        }
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub trigger: SweepTrigger,
    pub pages: u64,
    pub scanned: u64,
    pub expired: u64,
    pub failed: u64,
}

impl SweepReport {
    fn new(trigger: SweepTrigger) -> Self {
        Self {
            trigger,
            pages: 0,
            scanned: 0,
            expired: 0,
            failed: 0,
        }
    }
}

#[derive(Clone)]
pub struct ExpirationReconciler {
    repository: Arc<dyn LicenseRepository>,
    startup_page_size: u32,
    periodic_page_size: u32,
}

impl std::fmt::Debug for ExpirationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationReconciler")
            .field("startup_page_size", &self.startup_page_size)
            .field("periodic_page_size", &self.periodic_page_size)
            .finish()
    }
}

impl ExpirationReconciler {
    pub fn new(repository: Arc<dyn LicenseRepository>) -> Self {
        Self {
            repository,
            startup_page_size: DEFAULT_STARTUP_PAGE_SIZE,
            periodic_page_size: DEFAULT_PERIODIC_PAGE_SIZE,
        }
    }

    pub fn with_page_sizes(mut self, startup: u32, periodic: u32) -> Self {
        self.startup_page_size = startup.max(1);
        self.periodic_page_size = periodic.max(1);
        self
    }

    fn page_size(&self, trigger: SweepTrigger) -> u32 {
        match trigger {
            SweepTrigger::Startup => self.startup_page_size,
            SweepTrigger::Scheduled => self.periodic_page_size,
        }
    }

    /// Run one full pass. Fails only when a page cannot be listed.
    pub async fn run_pass(&self, trigger: SweepTrigger) -> Result<SweepReport, DomainError> {
        let limit = self.page_size(trigger);
        let mut report = SweepReport::new(trigger);
        let mut offset: u64 = 0;

        info!(trigger = trigger.as_str(), page_size = limit, "Starting expiration sweep");

        loop {
            let page = self
                .repository
                .list(&ListParams::active_by_expiry(limit, offset))
                .await?;

            let fetched = page.items.len() as u64;
            let now = Utc::now();
            let mut expired_in_page: u64 = 0;

            report.pages += 1;
            report.scanned += fetched;

            for license in page.items.iter().filter(|l| l.is_expired_at(now)) {
                match self
                    .repository
                    .update_status(license.id(), LicenseStatus::Expired)
                    .await
                {
                    Ok(()) => expired_in_page += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            license_id = %license.id(),
                            trigger = trigger.as_str(),
                            error = %e,
                            "Failed to expire license"
                        );
                    }
                }
            }

            report.expired += expired_in_page;

            if fetched < u64::from(limit) {
                break;
            }

            // Expired rows leave the active set, so only the rows still active shift the window
            offset += fetched - expired_in_page;

            if trigger == SweepTrigger::Scheduled && page.total > 0 && offset > page.total {
                break;
            }
        }

        record_expirations(trigger.source(), report.expired);

        info!(
            trigger = trigger.as_str(),
            pages = report.pages,
            scanned = report.scanned,
            expired = report.expired,
            failed = report.failed,
            "Expiration sweep finished"
        );

        Ok(report)
    }

    pub async fn startup_sweep(&self) -> Result<SweepReport, DomainError> {
        self.run_pass(SweepTrigger::Startup).await
    }

    pub async fn scheduled_sweep(&self) -> Result<SweepReport, DomainError> {
        self.run_pass(SweepTrigger::Scheduled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::license::{License, LicensePage, MockLicenseRepository};
    use crate::infrastructure::license::InMemoryLicenseRepository;
    use chrono::Duration;

    fn license(key: &str, expires_in_hours: Option<i64>) -> License {
        let license = License::new(key, "subscription", "Foo", LicenseStatus::Active);
        match expires_in_hours {
            Some(hours) => license.with_expires_at(Utc::now() + Duration::hours(hours)),
            None => license,
        }
    }

    async fn seeded(licenses: Vec<License>) -> Arc<InMemoryLicenseRepository> {
        let repository = Arc::new(InMemoryLicenseRepository::new());
        for license in licenses {
            repository.create(license).await.unwrap();
        }
        repository
    }

    async fn overdue_active(repository: &InMemoryLicenseRepository) -> usize {
        let page = repository
            .list(&ListParams::active_by_expiry(100, 0))
            .await
            .unwrap();
        let now = Utc::now();
        page.items.iter().filter(|l| l.is_expired_at(now)).count()
    }

    #[tokio::test]
    async fn test_pass_expires_all_overdue_licenses() {
        let repository = seeded(vec![
            license("a", Some(-48)),
            license("b", Some(-2)),
            license("c", Some(-1)),
            license("d", Some(5)),
            license("e", None),
        ])
        .await;

        let report = ExpirationReconciler::new(repository.clone())
            .run_pass(SweepTrigger::Startup)
            .await
            .unwrap();

        assert_eq!(report.expired, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(overdue_active(&repository).await, 0);

        let remaining = repository
            .list(&ListParams::active_by_expiry(100, 0))
            .await
            .unwrap();
        assert_eq!(remaining.total, 2);
    }

    #[tokio::test]
    async fn test_pass_converges_across_pages() {
        let mut licenses: Vec<License> = (0..7)
            .map(|i| license(&format!("overdue-{i}"), Some(-(i + 1))))
            .collect();
        licenses.extend((0..4).map(|i| license(&format!("future-{i}"), Some(i + 1))));
        let repository = seeded(licenses).await;

        let report = ExpirationReconciler::new(repository.clone())
            .with_page_sizes(3, 3)
            .run_pass(SweepTrigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(report.expired, 7);
        assert!(report.pages > 1);
        assert_eq!(overdue_active(&repository).await, 0);
    }

    #[tokio::test]
    async fn test_pass_ignores_non_active_licenses() {
        let revoked = License::new("r", "trial", "Foo", LicenseStatus::Revoked)
            .with_expires_at(Utc::now() - Duration::days(1));
        let repository = seeded(vec![revoked]).await;

        let report = ExpirationReconciler::new(repository.clone())
            .run_pass(SweepTrigger::Startup)
            .await
            .unwrap();

        assert_eq!(report.scanned, 0);
        assert_eq!(report.expired, 0);
        let stored = repository.find_by_key("r").await.unwrap().unwrap();
        assert_eq!(stored.status(), LicenseStatus::Revoked);
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let repository = seeded(vec![license("a", Some(-1)), license("b", Some(1))]).await;
        let reconciler = ExpirationReconciler::new(repository);

        let first = reconciler.startup_sweep().await.unwrap();
        let second = reconciler.scheduled_sweep().await.unwrap();

        assert_eq!(first.expired, 1);
        assert_eq!(second.expired, 0);
        assert_eq!(second.scanned, 1);
    }

    #[tokio::test]
    async fn test_row_failure_does_not_abort_pass() {
        let first = license("a", Some(-2));
        let second = license("b", Some(-1));
        let failing_id = *first.id();
        let items = vec![first, second];

        let mut repository = MockLicenseRepository::new();
        repository.expect_list().times(1).returning(move |_| {
            Ok(LicensePage {
                items: items.clone(),
                total: 2,
            })
        });
        repository
            .expect_update_status()
            .times(2)
            .returning(move |id, _| {
                if *id == failing_id {
                    Err(DomainError::storage("lock timeout"))
                } else {
                    Ok(())
                }
            });

        let report = ExpirationReconciler::new(Arc::new(repository))
            .run_pass(SweepTrigger::Startup)
            .await
            .unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pages, 1);
    }

    #[tokio::test]
    async fn test_list_failure_fails_pass() {
        let mut repository = MockLicenseRepository::new();
        repository
            .expect_list()
            .returning(|_| Err(DomainError::storage("database unavailable")));

        let result = ExpirationReconciler::new(Arc::new(repository))
            .run_pass(SweepTrigger::Scheduled)
            .await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_scheduled_pass_stops_past_reported_total() {
        let page: Vec<License> = (0..2)
            .map(|i| license(&format!("k{i}"), Some(10)))
            .collect();

        let mut repository = MockLicenseRepository::new();
        repository.expect_list().times(2).returning(move |_| {
            Ok(LicensePage {
                items: page.clone(),
                total: 3,
            })
        });

        let report = ExpirationReconciler::new(Arc::new(repository))
            .with_page_sizes(2, 2)
            .run_pass(SweepTrigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.scanned, 4);
    }
}
