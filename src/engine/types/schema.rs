use serde::{Deserialize, Serialize};

use crate::engine::types::ColumnType;

/// Ordered list of (name, type) pairs. The first `num_key_columns` columns
/// are group-by keys; the rest hold aggregation intermediates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    pub column_names: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub num_key_columns: usize,
}

impl DataSchema {
    pub fn new(
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        num_key_columns: usize,
    ) -> Self {
        debug_assert_eq!(column_names.len(), column_types.len());
        debug_assert!(num_key_columns <= column_names.len());
        Self {
            column_names,
            column_types,
            num_key_columns,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn num_aggregation_columns(&self) -> usize {
        self.num_columns() - self.num_key_columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    pub fn is_aggregation_column(&self, index: usize) -> bool {
        index >= self.num_key_columns
    }
}
