use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::agg::AggregationFunction;
use crate::engine::errors::QueryExecutionError;
use crate::engine::executor::pool::ExecutorPool;
use crate::engine::executor::response::DataTable;
use crate::engine::executor::streaming::ResultStream;
use crate::engine::plan::block::{ExecutionStats, IntermediateBlock};
use crate::engine::plan::context::ExecutionContext;
use crate::engine::plan::leaf::LeafPlan;
use crate::engine::plan::maker::PlanMakerConfig;
use crate::engine::query::context::QueryContext;
use crate::engine::table::indexed::ConcurrentIndexedTable;
use crate::engine::table::order::{ResolvedOrderBy, resolve_order_by};
use crate::engine::types::{DataSchema, Key, Record};

/// How the per-segment blocks fold into one instance-level result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombineMode {
    Selection,
    Aggregation,
    /// sql group-by mode: shared indexed table, ordered and trimmed.
    GroupByIndexed,
    /// Legacy group-by mode: plain keyed merge, trimmed at the broker.
    GroupByLegacy,
}

/// The outcome of combining all leaf results. Partial results are always
/// preferred over failure: errors and timeouts travel alongside whatever
/// rows were merged.
pub struct CombineOutcome {
    pub block: IntermediateBlock,
    pub timed_out: bool,
    pub error: Option<QueryExecutionError>,
    pub num_groups_dropped: u64,
}

/// Executes its children in parallel on the shared worker pool and merges
/// their blocks, honoring the absolute deadline.
pub struct CombinePlan {
    leaves: Vec<LeafPlan>,
    query: Arc<QueryContext>,
    agg_functions: Arc<Vec<AggregationFunction>>,
    output_schema: DataSchema,
    mode: CombineMode,
    resolved_order_by: Option<Vec<ResolvedOrderBy>>,
    selection_sort: Option<Vec<(usize, bool)>>,
    config: PlanMakerConfig,
}

impl CombinePlan {
    pub fn new(
        query: Arc<QueryContext>,
        leaves: Vec<LeafPlan>,
        agg_functions: Arc<Vec<AggregationFunction>>,
        output_schema: DataSchema,
        config: PlanMakerConfig,
    ) -> Result<Self, QueryExecutionError> {
        let mode = if !query.is_aggregation_query() {
            CombineMode::Selection
        } else if query.group_by.is_some() {
            if query.options.group_by_mode_sql() {
                CombineMode::GroupByIndexed
            } else {
                CombineMode::GroupByLegacy
            }
        } else {
            CombineMode::Aggregation
        };

        let resolved_order_by = match (mode, &query.order_by) {
            (CombineMode::GroupByIndexed, Some(order_by)) => Some(resolve_order_by(
                order_by,
                query.group_by_expressions(),
                &query.aggregation_expressions(),
                &agg_functions,
            )?),
            _ => None,
        };
        let selection_sort = match (mode, &query.order_by) {
            (CombineMode::Selection, Some(order_by)) => {
                let mut sort = Vec::with_capacity(order_by.len());
                for order in order_by {
                    let index = query
                        .select
                        .iter()
                        .position(|e| *e == order.expression)
                        .ok_or_else(|| {
                            QueryExecutionError::BadQueryRequest(format!(
                                "order-by expression {} is not selected",
                                order.expression.label()
                            ))
                        })?;
                    sort.push((index, order.descending));
                }
                Some(sort)
            }
            _ => None,
        };

        Ok(Self {
            leaves,
            query,
            agg_functions,
            output_schema,
            mode,
            resolved_order_by,
            selection_sort,
            config,
        })
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    pub fn output_schema(&self) -> &DataSchema {
        &self.output_schema
    }

    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        stream: Option<&dyn ResultStream>,
    ) -> CombineOutcome {
        let pool = ExecutorPool::global();
        let (tx, mut rx) =
            mpsc::channel::<Result<IntermediateBlock, QueryExecutionError>>(
                self.leaves.len().max(1),
            );

        let table = match self.mode {
            CombineMode::GroupByIndexed => Some(Arc::new(ConcurrentIndexedTable::new(
                self.output_schema.clone(),
                Arc::clone(&self.agg_functions),
                self.resolved_order_by.clone(),
                self.query.limit,
                self.config.max_initial_holder_capacity,
                self.config.num_groups_limit,
            ))),
            _ => None,
        };

        for leaf in &self.leaves {
            let leaf = leaf.clone();
            let ctx = ctx.clone();
            let tx = tx.clone();
            let table = table.clone();
            let _task = pool.spawn(async move {
                let result = match (leaf.execute(&ctx), &table) {
                    (Ok(block), Some(table)) => {
                        // Upsert on the worker so segments merge
                        // concurrently; only stats travel back.
                        let num_keys = block.schema.num_key_columns;
                        let stats = block.stats;
                        let schema = block.schema;
                        for record in block.rows {
                            table.upsert(Key::from_record(&record, num_keys), record);
                        }
                        Ok(IntermediateBlock::new(schema, Vec::new(), stats))
                    }
                    (result, _) => result,
                };
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let deadline = tokio::time::Instant::from_std(ctx.deadline());
        let mut stats = ExecutionStats::default();
        let mut timed_out = false;
        let mut error: Option<QueryExecutionError> = None;
        let mut selection_rows: Vec<Record> = Vec::new();
        let mut aggregation_row: Option<Record> = None;
        let mut legacy_groups: HashMap<Key, Record, ahash::RandomState> = HashMap::default();
        let mut num_groups_dropped = 0u64;

        let mut received = 0;
        while received < self.leaves.len() {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(Ok(block))) => {
                    received += 1;
                    stats.merge(&block.stats);
                    match self.mode {
                        CombineMode::Selection => {
                            self.merge_selection(block, &mut selection_rows, stream);
                        }
                        CombineMode::Aggregation => {
                            self.merge_aggregation(block, &mut aggregation_row);
                        }
                        CombineMode::GroupByLegacy => {
                            self.merge_legacy(
                                block,
                                &mut legacy_groups,
                                &mut num_groups_dropped,
                            );
                        }
                        CombineMode::GroupByIndexed => {}
                    }
                }
                Ok(Some(Err(e))) => {
                    received += 1;
                    if matches!(e, QueryExecutionError::DeadlineExceeded) {
                        timed_out = true;
                    } else if error.is_none() {
                        error = Some(e);
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    // Deadline reached: stop accepting child results and
                    // signal the stragglers to abandon their work.
                    ctx.cancel();
                    timed_out = true;
                    debug!(
                        target: "stratodb::plan",
                        received,
                        expected = self.leaves.len(),
                        "Combine deadline reached with children outstanding"
                    );
                    break;
                }
            }
        }

        let rows = match self.mode {
            CombineMode::Selection => self.finalize_selection(selection_rows),
            CombineMode::Aggregation => aggregation_row.into_iter().collect(),
            CombineMode::GroupByLegacy => legacy_groups.into_values().collect(),
            CombineMode::GroupByIndexed => {
                let table = table.expect("indexed mode builds a table");
                table.finish(self.resolved_order_by.is_some());
                num_groups_dropped = table.num_groups_dropped();
                table.take_rows()
            }
        };
        if num_groups_dropped > 0 {
            warn!(
                target: "stratodb::plan",
                dropped = num_groups_dropped,
                "Groups beyond the cross-segment limit were dropped"
            );
        }

        CombineOutcome {
            block: IntermediateBlock::new(self.output_schema.clone(), rows, stats),
            timed_out,
            error,
            num_groups_dropped,
        }
    }

    fn merge_selection(
        &self,
        block: IntermediateBlock,
        rows: &mut Vec<Record>,
        stream: Option<&dyn ResultStream>,
    ) {
        match stream {
            Some(observer) => {
                // Streaming mode ships each child's rows immediately; the
                // final table stays metadata-only.
                if !block.rows.is_empty() {
                    observer.send(DataTable::new(self.output_schema.clone(), block.rows));
                }
            }
            None => rows.extend(block.rows),
        }
    }

    fn merge_aggregation(&self, block: IntermediateBlock, acc: &mut Option<Record>) {
        let Some(incoming) = block.rows.into_iter().next() else {
            return;
        };
        match acc {
            None => *acc = Some(incoming),
            Some(existing) => {
                for (i, function) in self.agg_functions.iter().enumerate() {
                    existing[i] = function.merge(&existing[i], &incoming[i]);
                }
            }
        }
    }

    fn merge_legacy(
        &self,
        block: IntermediateBlock,
        groups: &mut HashMap<Key, Record, ahash::RandomState>,
        dropped: &mut u64,
    ) {
        let num_keys = block.schema.num_key_columns;
        for record in block.rows {
            let key = Key::from_record(&record, num_keys);
            if let Some(existing) = groups.get_mut(&key) {
                for (i, function) in self.agg_functions.iter().enumerate() {
                    let col = num_keys + i;
                    existing[col] = function.merge(&existing[col], &record[col]);
                }
            } else if groups.len() >= self.config.num_groups_limit {
                *dropped += 1;
            } else {
                groups.insert(key, record);
            }
        }
    }

    fn finalize_selection(&self, mut rows: Vec<Record>) -> Vec<Record> {
        if let Some(sort) = &self.selection_sort {
            rows.sort_by(|a, b| {
                for (index, descending) in sort {
                    let ord = a[*index].compare(&b[*index]);
                    let ord = if *descending { ord.reverse() } else { ord };
                    if !ord.is_eq() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }
        rows.truncate(self.query.limit);
        rows
    }
}
