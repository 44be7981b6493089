use crate::engine::executor::metrics::ServerMetrics;
use crate::engine::executor::response::{DataTable, QueryErrorCode, QueryException, keys};
use crate::engine::executor::streaming::ResultStream;
use crate::engine::plan::combine::CombinePlan;
use crate::engine::plan::context::ExecutionContext;

/// The root of a server-side plan tree: runs the combine node and frames
/// its outcome as one self-describing DataTable.
pub struct InstanceResponsePlan {
    combine: CombinePlan,
}

impl InstanceResponsePlan {
    pub fn new(combine: CombinePlan) -> Self {
        Self { combine }
    }

    pub fn num_leaves(&self) -> usize {
        self.combine.num_leaves()
    }

    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        stream: Option<&dyn ResultStream>,
    ) -> DataTable {
        let outcome = self.combine.execute(ctx, stream).await;
        let metrics = ServerMetrics::global();

        let mut table = DataTable::new(outcome.block.schema, outcome.block.rows);
        let stats = outcome.block.stats;
        table.set_metadata(keys::NUM_DOCS_SCANNED, stats.num_docs_scanned);
        table.set_metadata(
            keys::NUM_ENTRIES_SCANNED_IN_FILTER,
            stats.num_entries_scanned_in_filter,
        );
        table.set_metadata(
            keys::NUM_ENTRIES_SCANNED_POST_FILTER,
            stats.num_entries_scanned_post_filter,
        );
        table.set_metadata(keys::NUM_SEGMENTS_PROCESSED, stats.num_segments_processed);
        table.set_metadata(keys::NUM_SEGMENTS_MATCHED, stats.num_segments_matched);

        if outcome.num_groups_dropped > 0 {
            metrics.on_groups_limit_reached(outcome.num_groups_dropped);
        }
        if outcome.timed_out {
            metrics.on_deadline_exceeded();
            table.exceptions.push(QueryException::new(
                QueryErrorCode::DeadlineExceeded,
                format!(
                    "Query did not finish before endTimeMs={}",
                    ctx.end_time_ms()
                ),
            ));
        }
        if let Some(error) = outcome.error {
            error.log();
            metrics.on_execution_exception();
            table.exceptions.push(QueryException::new(
                QueryErrorCode::ExecutionError,
                error.to_string(),
            ));
        }
        if let Some(observer) = stream {
            // Whatever was merged rather than streamed goes out as one last
            // data chunk; the returned table closes the stream with
            // metadata only.
            if !table.rows.is_empty() {
                let rows = std::mem::take(&mut table.rows);
                observer.send(DataTable::new(table.schema.clone(), rows));
            }
        }
        table
    }
}
