//! Reconcile command - one full expiration pass

use crate::Repositories;
use crate::infrastructure::license::ExpirationReconciler;

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let repositories = Repositories::from_config(&config).await?;

    let reconciler = ExpirationReconciler::new(repositories.licenses).with_page_sizes(
        config.reconciler.startup_page_size,
        config.reconciler.periodic_page_size,
    );

    let report = reconciler.startup_sweep().await?;

    println!(
        "Reconciliation finished: {} pages, {} scanned, {} expired, {} failed",
        report.pages, report.scanned, report.expired, report.failed
    );

    Ok(())
}
