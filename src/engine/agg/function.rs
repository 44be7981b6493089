use std::collections::BTreeSet;

use crate::engine::query::expr::ExpressionContext;
use crate::engine::types::{CellValue, ColumnType, ObjectValue};

/// Aggregation function with concrete state transitions per operation.
///
/// Each function owns three value shapes: per-row input, mergeable
/// intermediate (what travels between segments and servers), and final
/// result (what the broker presents). Merge is associative and commutative.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationFunction {
    Count,
    Sum(ExpressionContext),
    Min(ExpressionContext),
    Max(ExpressionContext),
    MinMaxRange(ExpressionContext),
    Avg(ExpressionContext),
    DistinctCount(ExpressionContext),
}

impl AggregationFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationFunction::Count => "count",
            AggregationFunction::Sum(_) => "sum",
            AggregationFunction::Min(_) => "min",
            AggregationFunction::Max(_) => "max",
            AggregationFunction::MinMaxRange(_) => "minmaxrange",
            AggregationFunction::Avg(_) => "avg",
            AggregationFunction::DistinctCount(_) => "distinctcount",
        }
    }

    pub fn input_expression(&self) -> Option<&ExpressionContext> {
        match self {
            AggregationFunction::Count => None,
            AggregationFunction::Sum(e)
            | AggregationFunction::Min(e)
            | AggregationFunction::Max(e)
            | AggregationFunction::MinMaxRange(e)
            | AggregationFunction::Avg(e)
            | AggregationFunction::DistinctCount(e) => Some(e),
        }
    }

    pub fn input_expressions(&self) -> Vec<&ExpressionContext> {
        self.input_expression().into_iter().collect()
    }

    /// Result-column label, e.g. `sum(n)` or `count(*)`.
    pub fn column_label(&self) -> String {
        match self.input_expression() {
            Some(e) => format!("{}({})", self.name(), e),
            None => format!("{}(*)", self.name()),
        }
    }

    pub fn intermediate_type(&self) -> ColumnType {
        match self {
            AggregationFunction::Count => ColumnType::Long,
            AggregationFunction::Sum(_)
            | AggregationFunction::Min(_)
            | AggregationFunction::Max(_) => ColumnType::Double,
            AggregationFunction::MinMaxRange(_)
            | AggregationFunction::Avg(_)
            | AggregationFunction::DistinctCount(_) => ColumnType::Object,
        }
    }

    pub fn final_result_column_type(&self) -> ColumnType {
        match self {
            AggregationFunction::Count | AggregationFunction::DistinctCount(_) => ColumnType::Long,
            _ => ColumnType::Double,
        }
    }

    /// Whether the intermediate orders directly. Non-comparable
    /// intermediates go through `extract_final` before ranking.
    pub fn is_intermediate_comparable(&self) -> bool {
        matches!(
            self,
            AggregationFunction::Count
                | AggregationFunction::Sum(_)
                | AggregationFunction::Min(_)
                | AggregationFunction::Max(_)
        )
    }

    pub fn initial_intermediate(&self) -> CellValue {
        match self {
            AggregationFunction::Count => CellValue::Long(0),
            AggregationFunction::Sum(_) => CellValue::Double(0.0),
            AggregationFunction::Min(_) | AggregationFunction::Max(_) => CellValue::Null,
            AggregationFunction::MinMaxRange(_) => CellValue::Null,
            AggregationFunction::Avg(_) => {
                CellValue::Object(ObjectValue::AvgPair { sum: 0.0, count: 0 })
            }
            AggregationFunction::DistinctCount(_) => {
                CellValue::Object(ObjectValue::StringSet(BTreeSet::new()))
            }
        }
    }

    /// Folds one row value into the intermediate. Null inputs are skipped
    /// for every function except count, which counts rows not values.
    pub fn accept(&self, acc: &mut CellValue, value: &CellValue) {
        match self {
            AggregationFunction::Count => {
                if let CellValue::Long(c) = acc {
                    *c += 1;
                }
            }
            AggregationFunction::Sum(_) => {
                if let (CellValue::Double(s), Some(v)) = (&mut *acc, value.as_f64()) {
                    *s += v;
                }
            }
            AggregationFunction::Min(_) => {
                if let Some(v) = value.as_f64() {
                    match *acc {
                        CellValue::Double(cur) if v < cur => *acc = CellValue::Double(v),
                        CellValue::Null => *acc = CellValue::Double(v),
                        _ => {}
                    }
                }
            }
            AggregationFunction::Max(_) => {
                if let Some(v) = value.as_f64() {
                    match *acc {
                        CellValue::Double(cur) if v > cur => *acc = CellValue::Double(v),
                        CellValue::Null => *acc = CellValue::Double(v),
                        _ => {}
                    }
                }
            }
            AggregationFunction::MinMaxRange(_) => {
                if let Some(v) = value.as_f64() {
                    match acc {
                        CellValue::Object(ObjectValue::MinMaxPair { min, max }) => {
                            if v < *min {
                                *min = v;
                            }
                            if v > *max {
                                *max = v;
                            }
                        }
                        CellValue::Null => {
                            *acc = CellValue::Object(ObjectValue::MinMaxPair { min: v, max: v });
                        }
                        _ => {}
                    }
                }
            }
            AggregationFunction::Avg(_) => {
                if let (CellValue::Object(ObjectValue::AvgPair { sum, count }), Some(v)) =
                    (&mut *acc, value.as_f64())
                {
                    *sum += v;
                    *count += 1;
                }
            }
            AggregationFunction::DistinctCount(_) => {
                if !value.is_null() {
                    if let CellValue::Object(ObjectValue::StringSet(set)) = acc {
                        set.insert(value.to_string());
                    }
                }
            }
        }
    }

    /// Merges two intermediates into one. Null merges as identity.
    pub fn merge(&self, a: &CellValue, b: &CellValue) -> CellValue {
        if a.is_null() {
            return b.clone();
        }
        if b.is_null() {
            return a.clone();
        }
        match self {
            AggregationFunction::Count => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => CellValue::Long(x + y),
                _ => a.clone(),
            },
            AggregationFunction::Sum(_) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => CellValue::Double(x + y),
                _ => a.clone(),
            },
            AggregationFunction::Min(_) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => CellValue::Double(x.min(y)),
                _ => a.clone(),
            },
            AggregationFunction::Max(_) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => CellValue::Double(x.max(y)),
                _ => a.clone(),
            },
            AggregationFunction::MinMaxRange(_) => match (a, b) {
                (
                    CellValue::Object(ObjectValue::MinMaxPair { min: min_a, max: max_a }),
                    CellValue::Object(ObjectValue::MinMaxPair { min: min_b, max: max_b }),
                ) => CellValue::Object(ObjectValue::MinMaxPair {
                    min: min_a.min(*min_b),
                    max: max_a.max(*max_b),
                }),
                _ => a.clone(),
            },
            AggregationFunction::Avg(_) => match (a, b) {
                (
                    CellValue::Object(ObjectValue::AvgPair { sum: s1, count: c1 }),
                    CellValue::Object(ObjectValue::AvgPair { sum: s2, count: c2 }),
                ) => CellValue::Object(ObjectValue::AvgPair {
                    sum: s1 + s2,
                    count: c1 + c2,
                }),
                _ => a.clone(),
            },
            AggregationFunction::DistinctCount(_) => match (a, b) {
                (
                    CellValue::Object(ObjectValue::StringSet(x)),
                    CellValue::Object(ObjectValue::StringSet(y)),
                ) => {
                    let mut merged = x.clone();
                    merged.extend(y.iter().cloned());
                    CellValue::Object(ObjectValue::StringSet(merged))
                }
                _ => a.clone(),
            },
        }
    }

    /// Extracts the externally visible value from an intermediate.
    pub fn extract_final(&self, value: &CellValue) -> CellValue {
        match self {
            AggregationFunction::Count
            | AggregationFunction::Sum(_)
            | AggregationFunction::Min(_)
            | AggregationFunction::Max(_) => value.clone(),
            AggregationFunction::MinMaxRange(_) => match value {
                CellValue::Object(ObjectValue::MinMaxPair { min, max }) => {
                    CellValue::Double(max - min)
                }
                _ => CellValue::Null,
            },
            AggregationFunction::Avg(_) => match value {
                CellValue::Object(ObjectValue::AvgPair { sum, count }) => {
                    if *count == 0 {
                        CellValue::Double(0.0)
                    } else {
                        CellValue::Double(sum / *count as f64)
                    }
                }
                _ => CellValue::Null,
            },
            AggregationFunction::DistinctCount(_) => match value {
                CellValue::Object(ObjectValue::StringSet(set)) => CellValue::Long(set.len() as i64),
                _ => CellValue::Long(0),
            },
        }
    }
}
