use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Column types carried by a result schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Object,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Int | ColumnType::Long | ColumnType::Float | ColumnType::Double
        )
    }
}

/// Aggregation intermediates that travel as OBJECT cells between server and
/// broker. These are mergeable states, not final values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectValue {
    AvgPair { sum: f64, count: i64 },
    MinMaxPair { min: f64, max: f64 },
    StringSet(BTreeSet<String>),
}

/// A single typed cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Object(ObjectValue),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Long(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v as f64),
            CellValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v as i64),
            CellValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Int(_) | CellValue::Long(_) | CellValue::Float(_) | CellValue::Double(_) => {
                1
            }
            CellValue::String(_) => 2,
            CellValue::Bytes(_) => 3,
            CellValue::Object(_) => 4,
        }
    }

    /// Total order used by the order-by comparator. Numeric variants compare
    /// by value; nulls sort first; cross-kind comparisons fall back to a
    /// fixed kind rank so the order stays total.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => return a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => {}
        }
        match (self, other) {
            (CellValue::String(a), CellValue::String(b)) => a.cmp(b),
            (CellValue::Bytes(a), CellValue::Bytes(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

// Group keys hash and compare componentwise; floats go through their bit
// patterns so keys stay usable in hash maps.
impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Long(a), CellValue::Long(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => a.to_bits() == b.to_bits(),
            (CellValue::Double(a), CellValue::Double(b)) => a.to_bits() == b.to_bits(),
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Bytes(a), CellValue::Bytes(b)) => a == b,
            (CellValue::Object(a), CellValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Int(v) => v.hash(state),
            CellValue::Long(v) => v.hash(state),
            CellValue::Float(v) => v.to_bits().hash(state),
            CellValue::Double(v) => v.to_bits().hash(state),
            CellValue::String(v) => v.hash(state),
            CellValue::Bytes(v) => v.hash(state),
            CellValue::Object(_) => {
                // Object cells never appear in group keys.
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Long(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Double(v) => write!(f, "{}", v),
            CellValue::String(v) => write!(f, "{}", v),
            CellValue::Bytes(v) => {
                for b in v {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            CellValue::Object(o) => write!(f, "{:?}", o),
        }
    }
}
