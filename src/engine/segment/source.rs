use indexmap::IndexMap;

use crate::engine::segment::metadata::ColumnMetadata;
use crate::engine::types::{CellValue, ColumnType};

/// Per-column data source inside a segment: the values plus the metadata
/// the pruners and plan selector read.
#[derive(Debug, Clone)]
pub struct ColumnSource {
    pub column_type: ColumnType,
    values: Vec<CellValue>,
    dictionary: Option<Vec<CellValue>>,
    dictionary_sorted: bool,
    min: Option<CellValue>,
    max: Option<CellValue>,
    has_nulls: bool,
}

impl ColumnSource {
    fn from_values(column_type: ColumnType, values: Vec<CellValue>, with_dictionary: bool) -> Self {
        let mut min: Option<CellValue> = None;
        let mut max: Option<CellValue> = None;
        let mut has_nulls = false;
        for v in &values {
            if v.is_null() {
                has_nulls = true;
                continue;
            }
            match &min {
                Some(cur) if v.compare(cur).is_lt() => min = Some(v.clone()),
                None => min = Some(v.clone()),
                _ => {}
            }
            match &max {
                Some(cur) if v.compare(cur).is_gt() => max = Some(v.clone()),
                None => max = Some(v.clone()),
                _ => {}
            }
        }
        let dictionary = if with_dictionary {
            let mut uniq: Vec<CellValue> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            uniq.sort_by(|a, b| a.compare(b));
            uniq.dedup();
            Some(uniq)
        } else {
            None
        };
        Self {
            column_type,
            values,
            dictionary_sorted: with_dictionary,
            dictionary,
            min,
            max,
            has_nulls,
        }
    }

    pub fn value(&self, row: usize) -> CellValue {
        self.values.get(row).cloned().unwrap_or(CellValue::Null)
    }

    pub fn dictionary(&self) -> Option<&[CellValue]> {
        self.dictionary.as_deref()
    }

    pub fn has_sorted_dictionary(&self) -> bool {
        self.dictionary.is_some() && self.dictionary_sorted
    }

    pub fn metadata(&self) -> ColumnMetadata {
        ColumnMetadata {
            column_type: self.column_type,
            min: self.min.clone(),
            max: self.max.clone(),
            has_dictionary: self.dictionary.is_some(),
            dictionary_sorted: self.dictionary_sorted,
            cardinality: self.dictionary.as_ref().map(|d| d.len()).unwrap_or(0),
            has_nulls: self.has_nulls,
        }
    }
}

/// Read-only handle to one columnar segment. Created outside the query
/// core; the core only ever reads it.
#[derive(Debug)]
pub struct Segment {
    name: String,
    total_docs: usize,
    columns: IndexMap<String, ColumnSource>,
    mutable: bool,
    last_index_time_ms: Option<u64>,
    latest_ingestion_time_ms: Option<u64>,
}

impl Segment {
    pub fn builder(name: impl Into<String>) -> SegmentBuilder {
        SegmentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_docs(&self) -> usize {
        self.total_docs
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn last_index_time_ms(&self) -> Option<u64> {
        self.last_index_time_ms
    }

    pub fn latest_ingestion_time_ms(&self) -> Option<u64> {
        self.latest_ingestion_time_ms
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSource> {
        self.columns.get(name)
    }

    pub fn column_metadata(&self, name: &str) -> Option<ColumnMetadata> {
        self.columns.get(name).map(|c| c.metadata())
    }

    pub fn value(&self, column: &str, row: usize) -> CellValue {
        self.columns
            .get(column)
            .map(|c| c.value(row))
            .unwrap_or(CellValue::Null)
    }
}

/// Builds in-memory segments, the storage contract the executor runs
/// against. Column lengths must agree; the longest column defines the doc
/// count.
pub struct SegmentBuilder {
    name: String,
    columns: IndexMap<String, (ColumnType, Vec<CellValue>, bool)>,
    mutable: bool,
    last_index_time_ms: Option<u64>,
    latest_ingestion_time_ms: Option<u64>,
}

impl SegmentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            mutable: false,
            last_index_time_ms: None,
            latest_ingestion_time_ms: None,
        }
    }

    pub fn column(
        mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        values: Vec<CellValue>,
    ) -> Self {
        self.columns.insert(name.into(), (column_type, values, true));
        self
    }

    /// Same as `column` but without a dictionary, e.g. raw-encoded metrics.
    pub fn column_without_dictionary(
        mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        values: Vec<CellValue>,
    ) -> Self {
        self.columns
            .insert(name.into(), (column_type, values, false));
        self
    }

    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn last_index_time_ms(mut self, ts: u64) -> Self {
        self.last_index_time_ms = Some(ts);
        self
    }

    pub fn latest_ingestion_time_ms(mut self, ts: u64) -> Self {
        self.latest_ingestion_time_ms = Some(ts);
        self
    }

    pub fn build(self) -> Segment {
        let total_docs = self
            .columns
            .values()
            .map(|(_, values, _)| values.len())
            .max()
            .unwrap_or(0);
        let columns = self
            .columns
            .into_iter()
            .map(|(name, (column_type, values, with_dict))| {
                (
                    name,
                    ColumnSource::from_values(column_type, values, with_dict),
                )
            })
            .collect();
        Segment {
            name: self.name,
            total_docs,
            columns,
            mutable: self.mutable,
            last_index_time_ms: self.last_index_time_ms,
            latest_ingestion_time_ms: self.latest_ingestion_time_ms,
        }
    }
}
