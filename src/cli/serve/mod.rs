//! Serve command - HTTP API plus the expiration sweeps

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::AppContext;
use crate::api::create_router;
use crate::config::AppConfig;
use crate::infrastructure::license::ExpirationReconciler;
use crate::infrastructure::observability::init_metrics;
use crate::infrastructure::scheduler::Scheduler;

pub const EXPIRATION_SWEEP_JOB: &str = "expiration_sweep";

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let metrics = init_metrics(&config.metrics);

    let AppContext {
        state,
        reconciler,
        background,
    } = crate::create_app_context_with_config(&config).await?;

    // The startup sweep runs alongside serving; validation expires lazily meanwhile
    let startup_sweep = config.reconciler.run_on_startup.then(|| {
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            if let Err(e) = reconciler.startup_sweep().await {
                error!(error = %e, "Startup expiration sweep failed");
            }
        })
    });

    let scheduler = build_scheduler(&config, reconciler)?.start();

    let app = create_router(state, metrics);
    let addr = build_socket_addr(&config)?;
    info!("Starting license service on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, shutting down background work");

    scheduler.shutdown().await;

    if let Some(handle) = startup_sweep {
        handle.abort();
    }

    let grace = config.server.shutdown_grace();
    if tokio::time::timeout(grace, background.drain()).await.is_err() {
        warn!(
            in_flight = background.in_flight(),
            grace_secs = grace.as_secs(),
            "Background tasks still running after shutdown grace period"
        );
    }

    info!("License service shutdown complete");
    Ok(())
}

fn build_scheduler(
    config: &AppConfig,
    reconciler: Arc<ExpirationReconciler>,
) -> anyhow::Result<Scheduler> {
    let mut scheduler = Scheduler::new();

    scheduler.register(EXPIRATION_SWEEP_JOB, config.reconciler.interval(), move || {
        let reconciler = reconciler.clone();
        async move { reconciler.scheduled_sweep().await.map(|_| ()) }
    })?;

    Ok(scheduler)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
