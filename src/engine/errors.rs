use thiserror::Error;
use tracing::{error, info};

/// Errors raised while executing a query on the server side.
#[derive(Debug, Error)]
pub enum QueryExecutionError {
    #[error("Bad query request: {0}")]
    BadQueryRequest(String),

    #[error("Request decode failed: {0}")]
    RequestDecode(String),

    #[error("Unknown aggregation function: {0}")]
    UnknownAggregation(String),

    #[error("Expression evaluation failed: {0}")]
    ExprEval(String),

    #[error("Order-by expression does not reference a group-by or aggregation expression: {0}")]
    UnresolvedOrderBy(String),

    #[error("Query deadline exceeded")]
    DeadlineExceeded,

    #[error("Plan execution aborted")]
    Aborted,

    #[error("Response serialization failed: {0}")]
    ResponseSerialization(String),
}

impl QueryExecutionError {
    /// Client-input errors log at info; everything else reflects a server
    /// problem and logs at error.
    pub fn log(&self) {
        match self {
            QueryExecutionError::BadQueryRequest(msg) => {
                info!(target: "stratodb::executor", "Bad query request: {}", msg);
            }
            other => {
                error!(target: "stratodb::executor", "Query execution failed: {}", other);
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QueryExecutionError::BadQueryRequest(_)
                | QueryExecutionError::RequestDecode(_)
                | QueryExecutionError::UnknownAggregation(_)
                | QueryExecutionError::UnresolvedOrderBy(_)
        )
    }
}

/// Errors raised while reducing per-server results at the broker.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Cannot reduce: no data tables to merge")]
    Empty,

    #[error("Data tables disagree on schema: {0}")]
    SchemaMismatch(String),

    #[error("Expected exactly one aggregation function, got {0}")]
    MultipleAggregations(usize),

    #[error("Unknown aggregation function: {0}")]
    UnknownAggregation(String),

    #[error("Order-by cannot be resolved against the merged schema: {0}")]
    OrderBy(String),
}
