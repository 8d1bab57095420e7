//! Bounded pool for detached, best-effort side effects
//!
//! Tasks submitted here are spawned onto the runtime rather than awaited by
//! the caller, so they keep running after the originating request completes
//! or is cancelled. Each task carries its own timeout. Failures are logged
//! and never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::domain::DomainError;
use crate::infrastructure::observability::record_background_task_dropped;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

#[derive(Debug, Clone)]
pub struct BackgroundTasks {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BackgroundTasks {
    pub fn new(max_in_flight: usize) -> Self {
        let capacity = max_in_flight.max(1);

        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Submit a task without waiting.
    ///
    /// Returns `false` when the pool is saturated; the task is then dropped.
    pub fn spawn<F>(&self, name: &'static str, timeout: Duration, task: F) -> bool
    where
        F: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    task = name,
                    capacity = self.capacity,
                    "Background task pool saturated, dropping task"
                );
                record_background_task_dropped(name);
                return false;
            }
        };

        tokio::spawn(async move {
            let _permit = permit;

            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => debug!(task = name, "Background task completed"),
                Ok(Err(e)) => error!(task = name, error = %e, "Background task failed"),
                Err(_) => error!(
                    task = name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Background task timed out"
                ),
            }
        });

        true
    }

    /// Number of tasks currently running
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Wait until every running task has finished
    pub async fn drain(&self) {
        if let Ok(all) = self.permits.acquire_many(self.capacity as u32).await {
            drop(all);
        }
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_spawned_task_runs_to_completion() {
        let tasks = BackgroundTasks::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        assert!(tasks.spawn("increment", Duration::from_secs(1), async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        tasks.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_saturated_pool_drops_task() {
        let tasks = BackgroundTasks::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        assert!(tasks.spawn("blocker", Duration::from_secs(5), async move {
            let _ = release_rx.await;
            Ok(())
        }));

        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        let accepted = tasks.spawn("overflow", Duration::from_secs(1), async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(!accepted);

        release_tx.send(()).unwrap();
        tasks.drain().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timed_out_task_releases_permit() {
        let tasks = BackgroundTasks::new(1);

        tasks.spawn("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });

        tokio::time::timeout(Duration::from_secs(5), tasks.drain())
            .await
            .expect("drain should finish once the task times out");
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failing_task_is_contained() {
        let tasks = BackgroundTasks::new(2);

        assert!(tasks.spawn("failing", Duration::from_secs(1), async {
            Err(DomainError::storage("connection reset"))
        }));

        tasks.drain().await;

        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        assert!(tasks.spawn("after", Duration::from_secs(1), async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        tasks.drain().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
