use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

/// Process-wide query counters. The only cross-query shared state besides
/// the worker pool; all updates are atomic.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    queries: AtomicU64,
    scheduling_timeouts: AtomicU64,
    deadline_exceeded: AtomicU64,
    missing_tables: AtomicU64,
    execution_exceptions: AtomicU64,
    groups_limit_reached: AtomicU64,
}

static GLOBAL: Lazy<Arc<ServerMetrics>> = Lazy::new(|| Arc::new(ServerMetrics::default()));

impl ServerMetrics {
    pub fn global() -> Arc<ServerMetrics> {
        Arc::clone(&GLOBAL)
    }

    pub fn on_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_scheduling_timeout(&self) {
        self.scheduling_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_deadline_exceeded(&self) {
        self.deadline_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_missing_table(&self) {
        self.missing_tables.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_execution_exception(&self) {
        self.execution_exceptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_groups_limit_reached(&self, dropped: u64) {
        self.groups_limit_reached.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn scheduling_timeouts(&self) -> u64 {
        self.scheduling_timeouts.load(Ordering::Relaxed)
    }

    pub fn deadline_exceeded(&self) -> u64 {
        self.deadline_exceeded.load(Ordering::Relaxed)
    }

    pub fn missing_tables(&self) -> u64 {
        self.missing_tables.load(Ordering::Relaxed)
    }

    pub fn execution_exceptions(&self) -> u64 {
        self.execution_exceptions.load(Ordering::Relaxed)
    }

    pub fn groups_limit_reached(&self) -> u64 {
        self.groups_limit_reached.load(Ordering::Relaxed)
    }
}
