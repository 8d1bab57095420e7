//! Recurring job scheduler
//!
//! A `Scheduler` is built once at startup and owns its registration table.
//! `start` hands every registered job its own interval loop; the returned
//! handle stops them all.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::DomainError;

pub type JobFuture = BoxFuture<'static, Result<(), DomainError>>;
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct Registration {
    name: String,
    every: Duration,
    job: JobFn,
}

#[derive(Default)]
pub struct Scheduler {
    registrations: Vec<Registration>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.job_names())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job to run every `every`, first run one interval after start
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<String>,
        every: Duration,
        job: F,
    ) -> Result<(), DomainError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let name = name.into();

        if every.is_zero() {
            return Err(DomainError::configuration(format!(
                "Job '{}' must have a non-zero interval",
                name
            )));
        }

        if self.registrations.iter().any(|r| r.name == name) {
            return Err(DomainError::configuration(format!(
                "Job '{}' is already registered",
                name
            )));
        }

        let job: JobFn = Arc::new(move || -> JobFuture { Box::pin(job()) });
        self.registrations.push(Registration { name, every, job });

        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    /// Execute a registered job once, outside its schedule
    pub async fn run_now(&self, name: &str) -> Result<(), DomainError> {
        let registration = self
            .registrations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::not_found(format!("Job '{}' is not registered", name)))?;

        (registration.job)().await
    }

    /// Spawn one loop per registered job
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = self
            .registrations
            .into_iter()
            .map(|registration| {
                info!(
                    job = %registration.name,
                    every_secs = registration.every.as_secs(),
                    "Scheduling job"
                );
                tokio::spawn(run_job(registration, shutdown_rx.clone()))
            })
            .collect();

        SchedulerHandle {
            shutdown: shutdown_tx,
            handles,
        }
    }
}

async fn run_job(registration: Registration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(registration.every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        if *shutdown.borrow() {
            break;
        }

        let started = Instant::now();
        debug!(job = %registration.name, "Running scheduled job");

        match (registration.job)().await {
            Ok(()) => debug!(
                job = %registration.name,
                duration_ms = started.elapsed().as_millis() as u64,
                "Scheduled job finished"
            ),
            Err(e) => error!(
                job = %registration.name,
                error = %e,
                "Scheduled job failed"
            ),
        }
    }

    info!(job = %registration.name, "Scheduled job stopped");
}

/// Running scheduler; dropping it without `shutdown` leaves the loops running
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal every loop to stop and wait for in-progress runs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduled job loop ended abnormally");
            }
        }
    }
}
