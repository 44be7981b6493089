use serde::{Deserialize, Serialize};

use crate::engine::errors::QueryExecutionError;
use crate::engine::query::context::QueryContext;

/// The serialized unit of work a broker sends to one server: a query plus
/// the segments of one table this server should execute it against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerQueryRequest {
    pub request_id: u64,
    /// Table name with type suffix, e.g. `myTable_OFFLINE`.
    pub table_name: String,
    pub segment_names: Vec<String>,
    pub query: QueryContext,
    pub streaming: bool,
    /// Wall-clock arrival time at the broker, epoch milliseconds. The
    /// absolute deadline is `arrival_time_ms + timeout`.
    pub arrival_time_ms: u64,
}

impl ServerQueryRequest {
    pub fn encode(&self) -> Result<Vec<u8>, QueryExecutionError> {
        bincode::serialize(self)
            .map_err(|e| QueryExecutionError::ResponseSerialization(e.to_string()))
    }

    /// Decode gate: failures here are fatal to the request and must be
    /// reported as INVALID_ARGUMENT without touching any segment.
    pub fn decode(bytes: &[u8]) -> Result<Self, QueryExecutionError> {
        bincode::deserialize(bytes).map_err(|e| QueryExecutionError::RequestDecode(e.to_string()))
    }
}
