use crate::engine::types::{DataSchema, Record};

/// Per-execution counters accumulated across leaf plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub num_docs_scanned: u64,
    pub num_entries_scanned_in_filter: u64,
    pub num_entries_scanned_post_filter: u64,
    pub num_segments_processed: u64,
    pub num_segments_matched: u64,
}

impl ExecutionStats {
    pub fn merge(&mut self, other: &ExecutionStats) {
        self.num_docs_scanned += other.num_docs_scanned;
        self.num_entries_scanned_in_filter += other.num_entries_scanned_in_filter;
        self.num_entries_scanned_post_filter += other.num_entries_scanned_post_filter;
        self.num_segments_processed += other.num_segments_processed;
        self.num_segments_matched += other.num_segments_matched;
    }
}

/// Result of executing one plan node: schema-consistent rows plus stats.
/// For group-by results, rows carry key columns first.
#[derive(Debug, Clone)]
pub struct IntermediateBlock {
    pub schema: DataSchema,
    pub rows: Vec<Record>,
    pub stats: ExecutionStats,
}

impl IntermediateBlock {
    pub fn new(schema: DataSchema, rows: Vec<Record>, stats: ExecutionStats) -> Self {
        Self {
            schema,
            rows,
            stats,
        }
    }
}
