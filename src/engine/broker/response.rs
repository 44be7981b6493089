use crate::engine::executor::response::QueryException;
use crate::engine::types::{DataSchema, Record};

/// Tabular result presentation (`responseFormat=sql`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub schema: DataSchema,
    pub rows: Vec<Record>,
}

/// One group row in a per-aggregation result list.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByEntry {
    pub group: Vec<String>,
    pub value: crate::engine::types::CellValue,
}

/// Per-aggregation presentation (legacy response format).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub function: String,
    /// Set for aggregation-only queries.
    pub value: Option<crate::engine::types::CellValue>,
    pub group_by_columns: Vec<String>,
    pub group_by_result: Vec<GroupByEntry>,
}

/// The final broker response after merging every server's DataTable.
#[derive(Debug, Clone, Default)]
pub struct BrokerResponse {
    pub result_table: Option<ResultTable>,
    pub aggregation_results: Vec<AggregationResult>,
    pub exceptions: Vec<QueryException>,
    pub total_docs: u64,
    pub num_docs_scanned: u64,
    pub num_entries_scanned_in_filter: u64,
    pub num_entries_scanned_post_filter: u64,
    pub num_segments_processed: u64,
    pub num_segments_matched: u64,
    pub num_segments_queried: u64,
    pub time_used_ms: u64,
}
