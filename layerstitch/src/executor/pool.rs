//! Bounded worker pool for tile batches.
//!
//! Every job is spawned onto the tokio runtime immediately, but a job only
//! starts its real work after acquiring a permit from the pool's semaphore,
//! so at most `size` jobs run at once.
//!
//! Results are collected by awaiting the job handles in submission order.
//! Progress callbacks therefore advance in submission order too: if job 3
//! finishes before job 1, nothing is reported until job 1 completes, then
//! 1, 2 and 3 are reported back to back. Counts are strictly increasing
//! either way.
//!
//! ```text
//! submit:   j0  j1  j2  j3  j4        (all spawned up front)
//! permits:  [j0  j1]  j2  j3  j4      (size = 2)
//! collect:  await j0 → progress(1/5)
//!           await j1 → progress(2/5)
//!           ...
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on concurrent workers.
pub const MAX_WORKERS: usize = 64;

/// A job that could not run to completion.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The job panicked or was aborted by the runtime.
    #[error("worker task failed: {0}")]
    TaskFailed(String),
}

/// Clamp a requested worker count to `1..=MAX_WORKERS`.
pub fn clamp_workers(requested: usize) -> usize {
    if requested > MAX_WORKERS {
        tracing::warn!(
            requested,
            max = MAX_WORKERS,
            "Worker count above maximum, clamping to {}",
            MAX_WORKERS
        );
    }
    requested.clamp(1, MAX_WORKERS)
}

/// Fixed-capacity pool that runs one batch of jobs and is then dropped.
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    label: String,
}

impl WorkerPool {
    /// Create a pool for a batch of `jobs` units of work.
    ///
    /// The pool size is `workers` clamped to `1..=MAX_WORKERS` and then to
    /// the number of jobs, so a batch of two never holds more than two
    /// permits.
    pub fn new(workers: usize, jobs: usize, label: impl Into<String>) -> Self {
        let size = clamp_workers(workers).min(jobs.max(1));
        let label = label.into();

        tracing::debug!(size, jobs, label = %label, "Created worker pool");

        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            label,
        }
    }

    /// Number of jobs allowed to run at the same time.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Label used in log output.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Highest number of jobs observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Spawn a job that waits for a permit before running.
    pub fn submit<F, T>(&self, job: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let in_flight = Arc::clone(&self.in_flight);
        let peak = Arc::clone(&self.peak_in_flight);

        tokio::spawn(async move {
            // The semaphore is never closed.
            let _permit = semaphore.acquire_owned().await.ok();

            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(current, Ordering::SeqCst);

            let output = job.await;

            in_flight.fetch_sub(1, Ordering::SeqCst);
            output
        })
    }

    /// Run a batch to completion.
    ///
    /// All jobs are submitted in order, then their handles are awaited in
    /// the same order. `on_progress(completed, total)` is called once per
    /// job as it is collected. The returned results line up with `jobs`.
    pub async fn run<F, T>(
        &self,
        jobs: Vec<F>,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Vec<Result<T, PoolError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let total = jobs.len();
        let handles: Vec<JoinHandle<T>> = jobs.into_iter().map(|job| self.submit(job)).collect();

        let mut results = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            let result = handle
                .await
                .map_err(|e| PoolError::TaskFailed(e.to_string()));
            if let Err(ref e) = result {
                tracing::error!(label = %self.label, index, error = %e, "Worker task failed");
            }
            results.push(result);
            on_progress(index + 1, total);
        }

        tracing::debug!(
            label = %self.label,
            total,
            peak = self.peak_in_flight(),
            "Worker pool drained"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clamp_workers() {
        assert_eq!(clamp_workers(0), 1);
        assert_eq!(clamp_workers(4), 4);
        assert_eq!(clamp_workers(64), 64);
        assert_eq!(clamp_workers(1000), MAX_WORKERS);
    }

    #[test]
    fn test_size_clamped_to_job_count() {
        let pool = WorkerPool::new(8, 3, "test");
        assert_eq!(pool.size(), 3);

        let pool = WorkerPool::new(2, 10, "test");
        assert_eq!(pool.size(), 2);

        let pool = WorkerPool::new(4, 0, "test");
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_in_submission_order() {
        let pool = WorkerPool::new(4, 5, "order");
        // Earlier jobs sleep longer so they finish last
        let jobs: Vec<_> = (0..5u64)
            .map(|i| async move {
                tokio::time::sleep(Duration::from_millis((5 - i) * 10)).await;
                i
            })
            .collect();

        let results = pool.run(jobs, |_, _| {}).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_progress_is_monotonic() {
        let pool = WorkerPool::new(3, 6, "progress");
        let jobs: Vec<_> = (0..6u64)
            .map(|i| async move {
                tokio::time::sleep(Duration::from_millis((i % 3) * 5)).await;
            })
            .collect();

        let mut seen = Vec::new();
        pool.run(jobs, |done, total| seen.push((done, total))).await;

        assert_eq!(seen, (1..=6).map(|n| (n, 6)).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrency_bounded() {
        let pool = WorkerPool::new(2, 8, "bounded");
        let jobs: Vec<_> = (0..8)
            .map(|_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .collect();

        pool.run(jobs, |_, _| {}).await;

        assert!(pool.peak_in_flight() <= 2);
        assert!(pool.peak_in_flight() >= 1);
    }

    async fn boom() -> u32 {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_job_reported() {
        let pool = WorkerPool::new(2, 2, "panic");
        let jobs: Vec<std::pin::Pin<Box<dyn Future<Output = u32> + Send>>> = vec![
            Box::pin(async { 1 }),
            Box::pin(boom()),
        ];

        let results = pool.run(jobs, |_, _| {}).await;
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(matches!(results[1], Err(PoolError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = WorkerPool::new(4, 0, "empty");
        let jobs: Vec<std::future::Ready<()>> = Vec::new();
        let mut calls = 0;
        let results = pool.run(jobs, |_, _| calls += 1).await;
        assert!(results.is_empty());
        assert_eq!(calls, 0);
    }
}
