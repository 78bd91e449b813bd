//! Bounded worker pool for provider calls

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const DEFAULT_POOL_WIDTH: usize = 4;

/// Runs futures on the tokio runtime with at most `width` of them in
/// flight at once
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    width: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_WIDTH)
    }
}

impl WorkerPool {
    /// A width of zero is raised to one
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawn `future` once a slot is free. The handle resolves when the
    /// future completes; a panic surfaces as a `JoinError`.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only waits
            let _permit = semaphore.acquire_owned().await.ok();
            future.await
        })
    }
}
