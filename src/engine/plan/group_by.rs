use std::collections::HashMap;

use crate::engine::errors::QueryExecutionError;
use crate::engine::plan::block::{ExecutionStats, IntermediateBlock};
use crate::engine::plan::context::ExecutionContext;
use crate::engine::plan::leaf::{LeafPlan, group_by_schema};
use crate::engine::plan::scan::{self, CANCEL_CHECK_INTERVAL};
use crate::engine::types::{CellValue, Key, Record};

/// Group-by over one segment: scan matching rows into a bounded per-segment
/// group holder. Groups past the holder capacity are dropped here; the
/// cross-segment cap is enforced by the combine node.
pub fn execute(
    leaf: &LeafPlan,
    ctx: &ExecutionContext,
) -> Result<IntermediateBlock, QueryExecutionError> {
    let query = &leaf.query;
    let segment = &leaf.segment;
    let group_by = query.group_by_expressions();
    let schema = group_by_schema(query, segment, &leaf.agg_functions);
    let mut stats = ExecutionStats {
        num_segments_processed: 1,
        ..Default::default()
    };
    let matched = scan::collect_matching_rows(segment, query, ctx, &mut stats)?;

    let inputs_per_row = (group_by.len()
        + leaf
            .agg_functions
            .iter()
            .filter(|f| f.input_expression().is_some())
            .count()) as u64;
    let mut holder: HashMap<Key, Record, ahash::RandomState> = HashMap::default();
    for (i, row) in matched.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && ctx.should_stop() {
            return Err(QueryExecutionError::DeadlineExceeded);
        }
        let mut key_values = Vec::with_capacity(group_by.len());
        for expr in group_by {
            key_values.push(scan::evaluate(segment, *row, expr)?);
        }
        stats.num_entries_scanned_post_filter += inputs_per_row;
        let key = Key(key_values);
        if !holder.contains_key(&key) {
            if holder.len() >= leaf.holder_capacity {
                continue;
            }
            let mut record: Record = key.values().to_vec();
            record.extend(leaf.agg_functions.iter().map(|f| f.initial_intermediate()));
            holder.insert(key.clone(), record);
        }
        let record = holder.get_mut(&key).expect("group inserted above");
        for (slot, function) in leaf.agg_functions.iter().enumerate() {
            let value = match function.input_expression() {
                Some(expr) => scan::evaluate(segment, *row, expr)?,
                None => CellValue::Null,
            };
            function.accept(&mut record[group_by.len() + slot], &value);
        }
    }

    let rows = holder.into_values().collect();
    Ok(IntermediateBlock::new(schema, rows, stats))
}
