use crate::engine::segment::source::{Segment, SegmentBuilder};
use crate::engine::types::{CellValue, ColumnType};

/// Builds in-memory segments for tests.
pub struct SegmentFactory {
    builder: SegmentBuilder,
}

impl SegmentFactory {
    pub fn new(name: &str) -> Self {
        Self {
            builder: Segment::builder(name),
        }
    }

    pub fn with_long_column(mut self, name: &str, values: &[i64]) -> Self {
        self.builder = self.builder.column(
            name,
            ColumnType::Long,
            values.iter().map(|v| CellValue::Long(*v)).collect(),
        );
        self
    }

    pub fn with_string_column(mut self, name: &str, values: &[&str]) -> Self {
        self.builder = self.builder.column(
            name,
            ColumnType::String,
            values.iter().map(|v| CellValue::String((*v).into())).collect(),
        );
        self
    }

    /// `city` string column plus `n` long column, one row per tuple.
    pub fn with_city_rows(self, rows: &[(&str, i64)]) -> Self {
        let cities: Vec<&str> = rows.iter().map(|(c, _)| *c).collect();
        let values: Vec<i64> = rows.iter().map(|(_, n)| *n).collect();
        self.with_string_column("city", &cities)
            .with_long_column("n", &values)
    }

    pub fn consuming(mut self, ingestion_time_ms: Option<u64>, index_time_ms: u64) -> Self {
        self.builder = self.builder.mutable(true).last_index_time_ms(index_time_ms);
        if let Some(ts) = ingestion_time_ms {
            self.builder = self.builder.latest_ingestion_time_ms(ts);
        }
        self
    }

    pub fn create(self) -> Segment {
        self.builder.build()
    }
}
