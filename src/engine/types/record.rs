use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::engine::types::CellValue;

/// Row of cells, key columns first, then aggregation intermediates. The
/// owning schema says where the split is.
pub type Record = Vec<CellValue>;

/// An ordered tuple of group-by values. Equality and hash are componentwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub Vec<CellValue>);

impl Key {
    pub fn from_record(record: &Record, num_key_columns: usize) -> Self {
        Key(record[..num_key_columns].to_vec())
    }

    /// Stable hash used as the deterministic tie-break in order-by ranking.
    pub fn hash_code(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn values(&self) -> &[CellValue] {
        &self.0
    }
}
