use serde::{Deserialize, Serialize};

use crate::engine::errors::QueryExecutionError;
use crate::engine::types::{DataSchema, Record};

/// Reserved DataTable metadata keys.
pub mod keys {
    pub const TOTAL_DOCS: &str = "totalDocs";
    pub const NUM_DOCS_SCANNED: &str = "numDocsScanned";
    pub const NUM_ENTRIES_SCANNED_IN_FILTER: &str = "numEntriesScannedInFilter";
    pub const NUM_ENTRIES_SCANNED_POST_FILTER: &str = "numEntriesScannedPostFilter";
    pub const NUM_SEGMENTS_PROCESSED: &str = "numSegmentsProcessed";
    pub const NUM_SEGMENTS_MATCHED: &str = "numSegmentsMatched";
    pub const NUM_SEGMENTS_QUERIED: &str = "numSegmentsQueried";
    pub const NUM_MISSING_SEGMENTS: &str = "numMissingSegments";
    pub const TIME_USED_MS: &str = "timeUsedMs";
    pub const NUM_CONSUMING_SEGMENTS_PROCESSED: &str = "numConsumingSegmentsProcessed";
    pub const MIN_CONSUMING_FRESHNESS_TIME_MS: &str = "minConsumingFreshnessTimeMs";
    pub const TRACE_INFO: &str = "traceInfo";
}

/// Surface-visible error kinds, attached in-band to a DataTable and mapped
/// to out-of-band transport errors where fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryErrorCode {
    InvalidArgument,
    SchedulingTimeout,
    TableMissing,
    ExecutionError,
    DeadlineExceeded,
    Internal,
}

impl QueryErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            QueryErrorCode::InvalidArgument => 100,
            QueryErrorCode::SchedulingTimeout => 190,
            QueryErrorCode::ExecutionError => 200,
            QueryErrorCode::TableMissing => 230,
            QueryErrorCode::DeadlineExceeded => 250,
            QueryErrorCode::Internal => 450,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            QueryErrorCode::SchedulingTimeout => "QUERY_SCHEDULING_TIMEOUT_ERROR",
            QueryErrorCode::ExecutionError => "QUERY_EXECUTION_ERROR",
            QueryErrorCode::TableMissing => "SERVER_TABLE_MISSING_ERROR",
            QueryErrorCode::DeadlineExceeded => "QUERY_EXECUTION_TIMEOUT_ERROR",
            QueryErrorCode::Internal => "INTERNAL",
        }
    }

    /// Transport-facing code for errors that abort the request instead of
    /// riding in-band on a DataTable.
    pub fn from_execution_error(error: &QueryExecutionError) -> Self {
        match error {
            QueryExecutionError::RequestDecode(_) => QueryErrorCode::InvalidArgument,
            QueryExecutionError::ResponseSerialization(_) => QueryErrorCode::Internal,
            QueryExecutionError::DeadlineExceeded => QueryErrorCode::DeadlineExceeded,
            _ => QueryErrorCode::ExecutionError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryException {
    pub error_code: QueryErrorCode,
    pub message: String,
}

impl QueryException {
    pub fn new(error_code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }
}

/// Self-describing on-wire result table: schema, typed cells, metadata and
/// in-band exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub schema: DataSchema,
    pub rows: Vec<Record>,
    pub metadata: indexmap::IndexMap<String, String>,
    pub exceptions: Vec<QueryException>,
}

impl DataTable {
    pub fn new(schema: DataSchema, rows: Vec<Record>) -> Self {
        Self {
            schema,
            rows,
            metadata: indexmap::IndexMap::new(),
            exceptions: Vec::new(),
        }
    }

    /// A table carrying no data, only metadata and/or exceptions.
    pub fn empty() -> Self {
        Self::new(DataSchema::new(Vec::new(), Vec::new(), 0), Vec::new())
    }

    pub fn with_exception(mut self, exception: QueryException) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn set_metadata(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(|v| v.parse().ok())
    }

    pub fn encode(&self) -> Result<Vec<u8>, QueryExecutionError> {
        bincode::serialize(self)
            .map_err(|e| QueryExecutionError::ResponseSerialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, QueryExecutionError> {
        bincode::deserialize(bytes)
            .map_err(|e| QueryExecutionError::ResponseSerialization(e.to_string()))
    }
}
