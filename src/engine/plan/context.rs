use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared execution state for one plan tree: the absolute deadline plus the
/// cancellation flag child tasks poll at loop-block granularity.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Instant,
    end_time_ms: u64,
    cancelled: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub fn new(deadline: Instant, end_time_ms: u64) -> Self {
        Self {
            deadline,
            end_time_ms,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn end_time_ms(&self) -> u64 {
        self.end_time_ms
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancellation is a hint; tasks must abandon remaining work promptly
    /// once this turns true.
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || Instant::now() >= self.deadline
    }
}
