use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::shared::config::CONFIG;

/// Process-wide worker pool backing combine-node execution. One task per
/// leaf plan is submitted here; the pool is shared across queries and lives
/// from `init` to `shutdown`.
pub struct ExecutorPool {
    /// Owned runtime, taken out at shutdown. Spawning goes through the
    /// handle so a retired pool can wind down without blocking anyone.
    runtime: Mutex<Option<tokio::runtime::Runtime>>,
    handle: tokio::runtime::Handle,
    worker_threads: usize,
}

static POOL: Lazy<RwLock<Option<Arc<ExecutorPool>>>> = Lazy::new(|| RwLock::new(None));

impl ExecutorPool {
    fn build(worker_threads: usize) -> Arc<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("stratodb-query-worker")
            .enable_time()
            .build()
            .expect("Failed to build executor pool runtime");
        let handle = runtime.handle().clone();
        Arc::new(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
            worker_threads,
        })
    }

    /// Initializes the process-wide pool. Calling twice replaces the pool;
    /// the old one winds down in the background.
    pub fn init(worker_threads: usize) {
        info!(
            target: "stratodb::executor",
            workers = worker_threads,
            "Initializing executor pool"
        );
        let pool = Self::build(worker_threads);
        let previous = POOL.write().replace(pool);
        if let Some(old) = previous {
            old.retire();
        }
    }

    /// Returns the shared pool, lazily initializing from config when `init`
    /// was never called.
    pub fn global() -> Arc<ExecutorPool> {
        if let Some(pool) = POOL.read().as_ref() {
            return Arc::clone(pool);
        }
        let mut guard = POOL.write();
        if guard.is_none() {
            *guard = Some(Self::build(CONFIG.query.worker_threads()));
        }
        Arc::clone(guard.as_ref().expect("pool initialized above"))
    }

    pub fn shutdown() {
        if let Some(pool) = POOL.write().take() {
            pool.retire();
        }
    }

    fn retire(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}
