use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::engine::errors::QueryExecutionError;
use crate::engine::executor::metrics::ServerMetrics;
use crate::engine::executor::response::{DataTable, QueryErrorCode, QueryException, keys};
use crate::engine::executor::streaming::ResultStream;
use crate::engine::executor::timer::{QueryPhase, TimerContext};
use crate::engine::plan::context::ExecutionContext;
use crate::engine::plan::maker::{PlanMaker, PlanMakerConfig};
use crate::engine::query::request::ServerQueryRequest;
use crate::engine::segment::manager::InstanceDataManager;
use crate::engine::segment::pruner::service::PrunerService;
use crate::engine::segment::source::Segment;
use crate::shared::config::CONFIG;

/// The server front door: decodes a request, walks the segment lifecycle,
/// prunes, plans, executes under the deadline and frames the response.
pub struct QueryExecutor {
    instance_manager: Arc<InstanceDataManager>,
    pruner_service: PrunerService,
    plan_maker: PlanMaker,
    default_timeout_ms: u64,
    metrics: Arc<ServerMetrics>,
}

impl QueryExecutor {
    pub fn new(instance_manager: Arc<InstanceDataManager>) -> Self {
        Self::with_config(
            instance_manager,
            PlanMakerConfig::default(),
            CONFIG.query.default_timeout_ms,
        )
    }

    pub fn with_config(
        instance_manager: Arc<InstanceDataManager>,
        plan_config: PlanMakerConfig,
        default_timeout_ms: u64,
    ) -> Self {
        Self {
            instance_manager,
            pruner_service: PrunerService::default(),
            plan_maker: PlanMaker::new(plan_config),
            default_timeout_ms,
            metrics: ServerMetrics::global(),
        }
    }

    /// Decode gate. A request that does not parse is fatal-to-request and
    /// never touches a segment.
    pub async fn execute_encoded(
        &self,
        bytes: &[u8],
        timer: &mut TimerContext,
        stream: Option<&dyn ResultStream>,
    ) -> Result<DataTable, QueryExecutionError> {
        match ServerQueryRequest::decode(bytes) {
            Ok(request) => Ok(self.execute(&request, timer, stream).await),
            Err(e) => {
                info!(target: "stratodb::executor", "Request decode failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn execute(
        &self,
        request: &ServerQueryRequest,
        timer: &mut TimerContext,
        stream: Option<&dyn ResultStream>,
    ) -> DataTable {
        self.metrics.on_query();
        timer.stop(QueryPhase::SchedulerWait);
        timer.start(QueryPhase::QueryProcessing);

        let query = &request.query;
        let timeout_ms = query
            .timeout_override_ms()
            .unwrap_or(self.default_timeout_ms);
        let end_time_ms = request.arrival_time_ms.saturating_add(timeout_ms);
        let now_ms = epoch_ms();

        if now_ms >= end_time_ms {
            self.metrics.on_scheduling_timeout();
            info!(
                target: "stratodb::executor",
                request_id = request.request_id,
                timeout_ms,
                "Query scheduled past its deadline"
            );
            let table = DataTable::empty().with_exception(QueryException::new(
                QueryErrorCode::SchedulingTimeout,
                format!(
                    "Query scheduling took longer than the {}ms timeout",
                    timeout_ms
                ),
            ));
            return self.finish(table, request, timer);
        }

        let Some(table_manager) = self.instance_manager.table(&request.table_name) else {
            self.metrics.on_missing_table();
            let table = DataTable::empty().with_exception(QueryException::new(
                QueryErrorCode::TableMissing,
                format!("Table {} is not hosted on this server", request.table_name),
            ));
            return self.finish(table, request, timer);
        };

        let mut acquired = table_manager.acquire(&request.segment_names);
        let segments = acquired.segments();
        let consuming = consuming_freshness(&segments);
        let total_docs: u64 = segments.iter().map(|s| s.total_docs() as u64).sum();

        timer.start(QueryPhase::SegmentPruning);
        let survivors = self.pruner_service.prune(segments, query);
        timer.stop(QueryPhase::SegmentPruning);

        let mut table = if survivors.is_empty() {
            empty_execution_table()
        } else {
            timer.start(QueryPhase::BuildQueryPlan);
            let plan = self
                .plan_maker
                .make_instance_plan(Arc::new(query.clone()), survivors);
            timer.stop(QueryPhase::BuildQueryPlan);
            match plan {
                Ok(plan) => {
                    timer.start(QueryPhase::QueryPlanExecution);
                    let deadline =
                        Instant::now() + Duration::from_millis(end_time_ms - now_ms);
                    let ctx = ExecutionContext::new(deadline, end_time_ms);
                    let table = plan.execute(&ctx, stream).await;
                    timer.stop(QueryPhase::QueryPlanExecution);
                    table
                }
                Err(e) => {
                    e.log();
                    self.metrics.on_execution_exception();
                    DataTable::empty().with_exception(QueryException::new(
                        QueryErrorCode::ExecutionError,
                        e.to_string(),
                    ))
                }
            }
        };

        acquired.release_all();

        table.set_metadata(keys::TOTAL_DOCS, total_docs);
        table.set_metadata(keys::NUM_MISSING_SEGMENTS, acquired.num_missing);
        if let Some((num_consuming, freshness_ms)) = consuming {
            table.set_metadata(keys::NUM_CONSUMING_SEGMENTS_PROCESSED, num_consuming);
            table.set_metadata(keys::MIN_CONSUMING_FRESHNESS_TIME_MS, freshness_ms);
        }
        self.finish(table, request, timer)
    }

    /// Final framing shared by every exit path: stop the processing timer,
    /// stamp the bookkeeping metadata, attach trace info when requested.
    fn finish(
        &self,
        mut table: DataTable,
        request: &ServerQueryRequest,
        timer: &mut TimerContext,
    ) -> DataTable {
        timer.stop(QueryPhase::QueryProcessing);
        table.set_metadata(keys::NUM_SEGMENTS_QUERIED, request.segment_names.len());
        table.set_metadata(
            keys::TIME_USED_MS,
            timer.duration_ms(QueryPhase::QueryProcessing),
        );
        if request.query.trace_enabled {
            table.set_metadata(keys::TRACE_INFO, timer.trace_info());
        }
        debug!(
            target: "stratodb::executor",
            request_id = request.request_id,
            table = %request.table_name,
            rows = table.rows.len(),
            exceptions = table.exceptions.len(),
            time_used_ms = timer.duration_ms(QueryPhase::QueryProcessing),
            "Query finished"
        );
        table
    }
}

/// Pruned-to-empty short circuit: all execution counters are zero, only the
/// bookkeeping keys carry values.
fn empty_execution_table() -> DataTable {
    let mut table = DataTable::empty();
    table.set_metadata(keys::NUM_DOCS_SCANNED, 0);
    table.set_metadata(keys::NUM_ENTRIES_SCANNED_IN_FILTER, 0);
    table.set_metadata(keys::NUM_ENTRIES_SCANNED_POST_FILTER, 0);
    table.set_metadata(keys::NUM_SEGMENTS_PROCESSED, 0);
    table.set_metadata(keys::NUM_SEGMENTS_MATCHED, 0);
    table
}

/// Walks the mutable segments, computing the count and the minimum
/// freshness across them. Ingestion time is preferred; index time is the
/// fallback when ingestion is unavailable.
fn consuming_freshness(segments: &[Arc<Segment>]) -> Option<(usize, u64)> {
    let mut num_consuming = 0usize;
    let mut min_freshness: Option<u64> = None;
    for segment in segments {
        if !segment.is_mutable() {
            continue;
        }
        num_consuming += 1;
        let freshness = segment
            .latest_ingestion_time_ms()
            .or(segment.last_index_time_ms());
        if let Some(ts) = freshness {
            min_freshness = Some(min_freshness.map_or(ts, |cur| cur.min(ts)));
        }
    }
    if num_consuming > 0 {
        Some((num_consuming, min_freshness.unwrap_or(0)))
    } else {
        None
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
