use crate::trigger::{NormalizedRequest, NormalizedResponse};
use crate::worker::{FaasWorker, WorkerError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("no workers available")]
    NoWorkers,
    #[error("max worker capacity of {0} reached, cannot add more workers")]
    Capacity(usize),
    #[error("available workers below required minimum of {min}, {available} available, timed out waiting for more workers")]
    BelowMinimum { min: usize, available: usize },
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of workers which must connect before triggers are served.
    pub min_workers: usize,
    /// Maximum number of concurrently connected workers.
    pub max_workers: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 100,
        }
    }
}

/// WorkerPool is a registry of connected FaasWorkers which
/// dispatches each trigger to exactly one idle worker.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

struct Inner {
    options: PoolOptions,
    next_id: AtomicU64,
    // Ordered by registration. A std Mutex is never held across an await.
    workers: Mutex<Vec<Entry>>,
    changed: tokio::sync::Notify,
}

struct Entry {
    worker: Arc<FaasWorker>,
    busy: bool,
}

impl WorkerPool {
    pub fn new(options: PoolOptions) -> Self {
        let options = PoolOptions {
            max_workers: options.max_workers.max(1),
            ..options
        };
        Self {
            inner: Arc::new(Inner {
                options,
                next_id: AtomicU64::new(1),
                workers: Mutex::new(Vec::new()),
                changed: tokio::sync::Notify::new(),
            }),
        }
    }

    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    /// Allocate a unique id for a new FaasWorker.
    pub fn next_worker_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register `worker` as idle and immediately available for dispatch.
    pub fn add_worker(&self, worker: Arc<FaasWorker>) -> Result<(), PoolError> {
        let mut workers = self.inner.workers.lock().unwrap();

        if workers.len() >= self.inner.options.max_workers {
            return Err(PoolError::Capacity(self.inner.options.max_workers));
        }
        tracing::debug!(worker = worker.id(), count = workers.len() + 1, "added worker");
        workers.push(Entry {
            worker,
            busy: false,
        });
        std::mem::drop(workers);

        self.inner.changed.notify_waiters();
        Ok(())
    }

    /// Remove the worker having `id`, returning whether it was registered.
    pub fn remove_worker(&self, id: u64) -> bool {
        let mut workers = self.inner.workers.lock().unwrap();

        let Some(index) = workers.iter().position(|e| e.worker.id() == id) else {
            return false;
        };
        workers.remove(index);

        let count = workers.len();
        std::mem::drop(workers);

        if count < self.inner.options.min_workers {
            tracing::warn!(
                worker = id,
                count,
                min_workers = self.inner.options.min_workers,
                "removed worker, and pool is now below its minimum"
            );
        } else {
            tracing::debug!(worker = id, count, "removed worker");
        }
        self.inner.changed.notify_waiters();
        true
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.lock().unwrap().len()
    }

    pub fn idle_count(&self) -> usize {
        let workers = self.inner.workers.lock().unwrap();
        workers.iter().filter(|e| e.is_idle()).count()
    }

    /// Dispatch `request` to an idle worker and await its response.
    ///
    /// Fails immediately with NoWorkers if every worker is busy.
    /// A worker which fails its dispatch is evicted from the pool.
    pub async fn dispatch(
        &self,
        request: NormalizedRequest,
    ) -> Result<NormalizedResponse, PoolError> {
        let lease = self.lease()?;
        let id = lease.worker.id();

        match lease.worker.send(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                tracing::warn!(worker = id, %error, "evicting worker after failed dispatch");
                lease.worker.evict();
                self.remove_worker(id);
                Err(error.into())
            }
        }
    }

    /// Wait until at least `min_workers` are registered.
    pub async fn wait_for_minimum_workers(&self, timeout: Duration) -> Result<(), PoolError> {
        let min = self.inner.options.min_workers;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register for notification before checking, to not miss a concurrent change.
            let changed = self.inner.changed.notified();

            let available = self.worker_count();
            if available >= min {
                return Ok(());
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return Err(PoolError::BelowMinimum {
                    min,
                    available: self.worker_count(),
                });
            }
        }
    }

    fn lease(&self) -> Result<Lease<'_>, PoolError> {
        let mut workers = self.inner.workers.lock().unwrap();

        let entry = workers
            .iter_mut()
            .find(|e| e.is_idle())
            .ok_or(PoolError::NoWorkers)?;
        entry.busy = true;

        Ok(Lease {
            pool: self,
            worker: entry.worker.clone(),
        })
    }
}

impl Entry {
    fn is_idle(&self) -> bool {
        !self.busy && self.worker.is_idle()
    }
}

// Lease marks a worker as busy for its lifetime.
// It's released even if the dispatch future is dropped mid-flight.
struct Lease<'p> {
    pool: &'p WorkerPool,
    worker: Arc<FaasWorker>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut workers = self.pool.inner.workers.lock().unwrap();

        if let Some(entry) = workers
            .iter_mut()
            .find(|e| e.worker.id() == self.worker.id())
        {
            entry.busy = false;
        }
    }
}
