//! Bounded worker pool for dispatched work.
//!
//! Inbound packets are processed off the receive task on pooled tokio
//! tasks. Concurrency is bounded by a semaphore: when the pool is
//! saturated, `submit` suspends the caller (the per-connection receive
//! loop), which backpressures the connection instead of growing an
//! unbounded task set.

use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;
use tracing::error;

/// Semaphore-bounded task spawner.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool allowing at most `limit` concurrent tasks.
    pub fn new(limit: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(limit.max(1))) }
    }

    /// Run `task` on the pool, waiting for a slot if none is free.
    ///
    /// The task runs on its own tokio task; a panic inside it is contained
    /// by the task boundary and never reaches the submitter.
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => {
                tokio::spawn(async move {
                    task.await;
                    drop(permit);
                });
            }
            // The semaphore is never closed; this is unreachable in practice.
            Err(err) => error!(%err, "worker pool unavailable, dropping task"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_stays_within_the_limit() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let finished = Arc::clone(&finished);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        while finished.load(Ordering::SeqCst) < 6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn tasks_run_to_completion() {
        let pool = WorkerPool::new(4);
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let count = Arc::clone(&count);
            pool.submit(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}
