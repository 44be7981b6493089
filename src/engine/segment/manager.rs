use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::engine::segment::handle::{AcquiredSegments, SegmentHandle};
use crate::engine::segment::source::Segment;

#[derive(Debug)]
struct SegmentEntry {
    segment: Arc<Segment>,
    refs: Arc<AtomicI64>,
}

/// Holds the resident segments of one table and hands out per-query leases.
#[derive(Debug)]
pub struct TableDataManager {
    table_name: String,
    segments: DashMap<String, SegmentEntry>,
}

impl TableDataManager {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            segments: DashMap::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn add_segment(&self, segment: Segment) {
        self.segments.insert(
            segment.name().to_string(),
            SegmentEntry {
                segment: Arc::new(segment),
                refs: Arc::new(AtomicI64::new(0)),
            },
        );
    }

    pub fn remove_segment(&self, name: &str) {
        self.segments.remove(name);
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Best-effort acquire: unknown ids are simply absent from the result,
    /// reported through `num_missing`.
    pub fn acquire(&self, segment_names: &[String]) -> AcquiredSegments {
        let mut handles = Vec::with_capacity(segment_names.len());
        for name in segment_names {
            if let Some(entry) = self.segments.get(name) {
                handles.push(SegmentHandle::new(
                    Arc::clone(&entry.segment),
                    Arc::clone(&entry.refs),
                ));
            }
        }
        let num_missing = segment_names.len() - handles.len();
        if num_missing > 0 {
            debug!(
                target: "stratodb::segment",
                table = %self.table_name,
                missing = num_missing,
                "Some requested segments are not resident"
            );
        }
        AcquiredSegments {
            handles,
            num_missing,
        }
    }

    /// Sum of outstanding leases across all segments. Zero when no query is
    /// in flight.
    pub fn outstanding_references(&self) -> i64 {
        self.segments
            .iter()
            .map(|e| e.refs.load(Ordering::Acquire))
            .sum()
    }
}

/// All tables hosted by this server instance, keyed by table name with type
/// suffix.
#[derive(Debug, Default)]
pub struct InstanceDataManager {
    tables: DashMap<String, Arc<TableDataManager>>,
}

impl InstanceDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&self, table: TableDataManager) -> Arc<TableDataManager> {
        let table = Arc::new(table);
        self.tables
            .insert(table.table_name().to_string(), Arc::clone(&table));
        table
    }

    pub fn table(&self, table_name: &str) -> Option<Arc<TableDataManager>> {
        self.tables.get(table_name).map(|t| Arc::clone(&t))
    }
}
