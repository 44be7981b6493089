use crate::engine::types::{CellValue, ColumnType};

/// Metadata snapshot for one column of one segment. Everything a pruner or
/// plan selector may touch; never the row data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub column_type: ColumnType,
    pub min: Option<CellValue>,
    pub max: Option<CellValue>,
    pub has_dictionary: bool,
    pub dictionary_sorted: bool,
    pub cardinality: usize,
    pub has_nulls: bool,
}
