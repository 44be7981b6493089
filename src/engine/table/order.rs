use std::cmp::Ordering;

use crate::engine::agg::AggregationFunction;
use crate::engine::errors::QueryExecutionError;
use crate::engine::query::expr::{ExpressionContext, FunctionContext, OrderByExpressionContext};
use crate::engine::types::{CellValue, Key, Record};

/// One order-by term bound to a record column. Order-by expressions must
/// reference either a group-by expression (a key column) or an aggregation
/// expression (an aggregation column).
#[derive(Debug, Clone)]
pub struct ResolvedOrderBy {
    pub record_index: usize,
    pub descending: bool,
    /// Set when the column holds a non-comparable aggregation intermediate;
    /// ranking then compares the extracted final result instead.
    pub finalize_with: Option<AggregationFunction>,
}

pub fn resolve_order_by(
    order_by: &[OrderByExpressionContext],
    group_by: &[ExpressionContext],
    agg_expressions: &[FunctionContext],
    agg_functions: &[AggregationFunction],
) -> Result<Vec<ResolvedOrderBy>, QueryExecutionError> {
    let mut resolved = Vec::with_capacity(order_by.len());
    for order in order_by {
        if let Some(pos) = group_by.iter().position(|g| *g == order.expression) {
            resolved.push(ResolvedOrderBy {
                record_index: pos,
                descending: order.descending,
                finalize_with: None,
            });
            continue;
        }
        let agg_pos = order
            .expression
            .as_function()
            .and_then(|f| agg_expressions.iter().position(|a| a == f));
        match agg_pos {
            Some(pos) => {
                let function = &agg_functions[pos];
                resolved.push(ResolvedOrderBy {
                    record_index: group_by.len() + pos,
                    descending: order.descending,
                    finalize_with: if function.is_intermediate_comparable() {
                        None
                    } else {
                        Some(function.clone())
                    },
                });
            }
            None => {
                return Err(QueryExecutionError::UnresolvedOrderBy(
                    order.expression.label(),
                ));
            }
        }
    }
    Ok(resolved)
}

/// Ranking projection of one record: only the order-by values, finalized
/// where the intermediate does not order directly, plus the key hash as the
/// deterministic tie-break. Built only while trimming or sorting.
#[derive(Debug, Clone)]
pub struct IntermediateRecord {
    pub values: Vec<CellValue>,
    pub key_hash: u64,
}

impl IntermediateRecord {
    pub fn project(key: &Key, record: &Record, order_by: &[ResolvedOrderBy]) -> Self {
        let values = order_by
            .iter()
            .map(|o| {
                let cell = &record[o.record_index];
                match &o.finalize_with {
                    Some(function) => function.extract_final(cell),
                    None => cell.clone(),
                }
            })
            .collect();
        Self {
            values,
            key_hash: key.hash_code(),
        }
    }

    /// Best-first ordering: `Less` means `self` ranks ahead of `other`.
    pub fn compare(&self, other: &IntermediateRecord, order_by: &[ResolvedOrderBy]) -> Ordering {
        for (i, o) in order_by.iter().enumerate() {
            let ord = self.values[i].compare(&other.values[i]);
            let ord = if o.descending { ord.reverse() } else { ord };
            if !ord.is_eq() {
                return ord;
            }
        }
        self.key_hash.cmp(&other.key_hash)
    }
}
