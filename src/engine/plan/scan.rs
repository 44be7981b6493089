use crate::engine::errors::QueryExecutionError;
use crate::engine::plan::block::ExecutionStats;
use crate::engine::plan::context::ExecutionContext;
use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::segment::source::Segment;
use crate::engine::types::CellValue;

/// How often scan loops poll the deadline flag.
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Evaluates a projection expression against one row. Transform functions
/// are compiled away before requests reach this core; anything else here is
/// a client error.
pub fn evaluate(
    segment: &Segment,
    row: usize,
    expr: &ExpressionContext,
) -> Result<CellValue, QueryExecutionError> {
    match expr {
        ExpressionContext::Identifier(column) => Ok(segment.value(column, row)),
        ExpressionContext::Literal(value) => Ok(value.clone()),
        ExpressionContext::Function(f) => Err(QueryExecutionError::ExprEval(format!(
            "uncompiled transform function: {}",
            f.name
        ))),
    }
}

/// Runs the filter over the whole segment, returning matching row ids and
/// charging the filter-phase scan counters.
pub fn collect_matching_rows(
    segment: &Segment,
    query: &QueryContext,
    ctx: &ExecutionContext,
    stats: &mut ExecutionStats,
) -> Result<Vec<usize>, QueryExecutionError> {
    let total = segment.total_docs();
    let mut matched = Vec::new();
    match &query.filter {
        None => {
            matched.extend(0..total);
        }
        Some(filter) => {
            for row in 0..total {
                if row % CANCEL_CHECK_INTERVAL == 0 && ctx.should_stop() {
                    return Err(QueryExecutionError::DeadlineExceeded);
                }
                stats.num_entries_scanned_in_filter += 1;
                let resolve = |column: &str| segment.value(column, row);
                if filter.evaluate(&resolve) {
                    matched.push(row);
                }
            }
        }
    }
    stats.num_docs_scanned += matched.len() as u64;
    if !matched.is_empty() {
        stats.num_segments_matched += 1;
    }
    Ok(matched)
}
