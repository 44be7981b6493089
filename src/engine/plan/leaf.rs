use std::sync::Arc;

use crate::engine::agg::AggregationFunction;
use crate::engine::errors::QueryExecutionError;
use crate::engine::plan::block::{ExecutionStats, IntermediateBlock};
use crate::engine::plan::context::ExecutionContext;
use crate::engine::plan::group_by;
use crate::engine::plan::scan::{self, CANCEL_CHECK_INTERVAL};
use crate::engine::plan::selector::PlanKind;
use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::segment::source::Segment;
use crate::engine::types::{CellValue, ColumnType, DataSchema, ObjectValue};

/// A plan node bound to one segment. Single-use: executed once by the
/// combine node on a pool worker.
#[derive(Clone)]
pub struct LeafPlan {
    pub kind: PlanKind,
    pub segment: Arc<Segment>,
    pub query: Arc<QueryContext>,
    pub agg_functions: Arc<Vec<AggregationFunction>>,
    pub holder_capacity: usize,
}

impl LeafPlan {
    pub fn execute(&self, ctx: &ExecutionContext) -> Result<IntermediateBlock, QueryExecutionError> {
        if ctx.should_stop() {
            return Err(QueryExecutionError::DeadlineExceeded);
        }
        match self.kind {
            PlanKind::Selection => self.execute_selection(ctx),
            PlanKind::MetadataAgg => self.execute_metadata_agg(),
            PlanKind::DictionaryAgg => self.execute_dictionary_agg(),
            PlanKind::ScanAgg => self.execute_scan_agg(ctx),
            PlanKind::GroupBy | PlanKind::GroupByOrderBy => group_by::execute(self, ctx),
        }
    }

    fn execute_selection(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<IntermediateBlock, QueryExecutionError> {
        let schema = selection_schema(&self.query, &self.segment);
        let mut stats = ExecutionStats {
            num_segments_processed: 1,
            ..Default::default()
        };
        let matched = scan::collect_matching_rows(&self.segment, &self.query, ctx, &mut stats)?;
        // Without an order-by any `limit` rows satisfy the query; with one,
        // every match competes for the top slots.
        let take_all = self.query.order_by.is_some();
        let mut rows = Vec::new();
        for (i, row) in matched.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && ctx.should_stop() {
                return Err(QueryExecutionError::DeadlineExceeded);
            }
            if !take_all && rows.len() >= self.query.limit {
                break;
            }
            let mut cells = Vec::with_capacity(self.query.select.len());
            for expr in &self.query.select {
                cells.push(scan::evaluate(&self.segment, *row, expr)?);
            }
            stats.num_entries_scanned_post_filter += self.query.select.len() as u64;
            rows.push(cells);
        }
        Ok(IntermediateBlock::new(schema, rows, stats))
    }

    /// count()-only without a filter reads the segment's doc count; no data
    /// is touched and the segment does not count as processed.
    fn execute_metadata_agg(&self) -> Result<IntermediateBlock, QueryExecutionError> {
        let schema = aggregation_schema(&self.agg_functions);
        let row = self
            .agg_functions
            .iter()
            .map(|_| CellValue::Long(self.segment.total_docs() as i64))
            .collect();
        Ok(IntermediateBlock::new(
            schema,
            vec![row],
            ExecutionStats::default(),
        ))
    }

    /// min/max/minmaxrange endpoints read straight off sorted dictionaries.
    fn execute_dictionary_agg(&self) -> Result<IntermediateBlock, QueryExecutionError> {
        let schema = aggregation_schema(&self.agg_functions);
        let mut row = Vec::with_capacity(self.agg_functions.len());
        for function in self.agg_functions.iter() {
            let column = function
                .input_expression()
                .and_then(|e| e.as_identifier())
                .ok_or_else(|| {
                    QueryExecutionError::BadQueryRequest(format!(
                        "{} over a non-identifier cannot use the dictionary",
                        function.name()
                    ))
                })?;
            let dictionary = self
                .segment
                .column(column)
                .and_then(|c| c.dictionary())
                .unwrap_or(&[]);
            let endpoints = match (dictionary.first(), dictionary.last()) {
                (Some(first), Some(last)) => Some((first, last)),
                _ => None,
            };
            let cell = match (function, endpoints) {
                (_, None) => CellValue::Null,
                (AggregationFunction::Min(_), Some((first, _))) => {
                    first.as_f64().map(CellValue::Double).unwrap_or(CellValue::Null)
                }
                (AggregationFunction::Max(_), Some((_, last))) => {
                    last.as_f64().map(CellValue::Double).unwrap_or(CellValue::Null)
                }
                (AggregationFunction::MinMaxRange(_), Some((first, last))) => {
                    match (first.as_f64(), last.as_f64()) {
                        (Some(min), Some(max)) => {
                            CellValue::Object(ObjectValue::MinMaxPair { min, max })
                        }
                        _ => CellValue::Null,
                    }
                }
                (other, _) => {
                    return Err(QueryExecutionError::BadQueryRequest(format!(
                        "{} cannot be answered from a dictionary",
                        other.name()
                    )));
                }
            };
            row.push(cell);
        }
        Ok(IntermediateBlock::new(
            schema,
            vec![row],
            ExecutionStats::default(),
        ))
    }

    fn execute_scan_agg(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<IntermediateBlock, QueryExecutionError> {
        let schema = aggregation_schema(&self.agg_functions);
        let mut stats = ExecutionStats {
            num_segments_processed: 1,
            ..Default::default()
        };
        let matched = scan::collect_matching_rows(&self.segment, &self.query, ctx, &mut stats)?;
        let mut intermediates: Vec<CellValue> = self
            .agg_functions
            .iter()
            .map(|f| f.initial_intermediate())
            .collect();
        let inputs_per_row = self
            .agg_functions
            .iter()
            .filter(|f| f.input_expression().is_some())
            .count() as u64;
        for (i, row) in matched.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && ctx.should_stop() {
                return Err(QueryExecutionError::DeadlineExceeded);
            }
            for (function, acc) in self.agg_functions.iter().zip(intermediates.iter_mut()) {
                let value = match function.input_expression() {
                    Some(expr) => scan::evaluate(&self.segment, *row, expr)?,
                    None => CellValue::Null,
                };
                function.accept(acc, &value);
            }
            stats.num_entries_scanned_post_filter += inputs_per_row;
        }
        Ok(IntermediateBlock::new(
            schema,
            vec![intermediates],
            stats,
        ))
    }
}

pub fn expression_type(segment: &Segment, expr: &ExpressionContext) -> ColumnType {
    match expr {
        ExpressionContext::Identifier(column) => segment
            .column(column)
            .map(|c| c.column_type)
            .unwrap_or(ColumnType::String),
        ExpressionContext::Literal(value) => match value {
            CellValue::Int(_) => ColumnType::Int,
            CellValue::Long(_) => ColumnType::Long,
            CellValue::Float(_) => ColumnType::Float,
            CellValue::Double(_) => ColumnType::Double,
            CellValue::Bytes(_) => ColumnType::Bytes,
            _ => ColumnType::String,
        },
        ExpressionContext::Function(_) => ColumnType::String,
    }
}

pub fn selection_schema(query: &QueryContext, segment: &Segment) -> DataSchema {
    let names = query.select.iter().map(|e| e.label()).collect();
    let types = query
        .select
        .iter()
        .map(|e| expression_type(segment, e))
        .collect();
    DataSchema::new(names, types, 0)
}

/// Aggregation-only result schema: one intermediate column per function.
pub fn aggregation_schema(agg_functions: &[AggregationFunction]) -> DataSchema {
    let names = agg_functions.iter().map(|f| f.column_label()).collect();
    let types = agg_functions.iter().map(|f| f.intermediate_type()).collect();
    DataSchema::new(names, types, 0)
}

/// Group-by result schema: key columns first, then one intermediate column
/// per aggregation function.
pub fn group_by_schema(
    query: &QueryContext,
    segment: &Segment,
    agg_functions: &[AggregationFunction],
) -> DataSchema {
    let group_by = query.group_by_expressions();
    let mut names: Vec<String> = group_by.iter().map(|e| e.label()).collect();
    let mut types: Vec<ColumnType> = group_by
        .iter()
        .map(|e| expression_type(segment, e))
        .collect();
    for function in agg_functions {
        names.push(function.column_label());
        types.push(function.intermediate_type());
    }
    DataSchema::new(names, types, group_by.len())
}
