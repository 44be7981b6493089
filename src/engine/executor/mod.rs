pub mod metrics;
pub mod pool;
pub mod query_executor;
pub mod response;
pub mod streaming;
pub mod timer;

pub use metrics::ServerMetrics;
pub use pool::ExecutorPool;
pub use query_executor::QueryExecutor;
pub use response::{DataTable, QueryErrorCode, QueryException};
pub use streaming::ResultStream;
pub use timer::{QueryPhase, TimerContext};

#[cfg(test)]
mod query_executor_test;
#[cfg(test)]
mod response_test;
#[cfg(test)]
mod timer_test;
