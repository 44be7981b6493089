use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::executor::query_executor::QueryExecutor;
use crate::engine::executor::response::{QueryErrorCode, keys};
use crate::engine::executor::timer::TimerContext;
use crate::engine::plan::maker::PlanMakerConfig;
use crate::engine::query::context::QueryContext;
use crate::engine::query::filter::FilterContext;
use crate::engine::query::options;
use crate::engine::query::request::ServerQueryRequest;
use crate::engine::segment::manager::{InstanceDataManager, TableDataManager};
use crate::engine::types::CellValue;
use crate::test_helpers::factories::{QueryFactory, SegmentFactory};

const TABLE: &str = "metrics_OFFLINE";

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

fn request(query: QueryContext, segments: &[&str]) -> ServerQueryRequest {
    ServerQueryRequest {
        request_id: 1,
        table_name: TABLE.into(),
        segment_names: segments.iter().map(|s| s.to_string()).collect(),
        query,
        streaming: false,
        arrival_time_ms: now_ms(),
    }
}

fn setup() -> (Arc<InstanceDataManager>, Arc<TableDataManager>, QueryExecutor) {
    let instance = Arc::new(InstanceDataManager::new());
    let table = instance.add_table(TableDataManager::new(TABLE));
    let executor = QueryExecutor::with_config(
        Arc::clone(&instance),
        PlanMakerConfig::new(1000, 10_000),
        10_000,
    );
    (instance, table, executor)
}

#[tokio::test]
async fn missing_table_reports_in_band() {
    let (_instance, _table, executor) = setup();
    let req = request(QueryFactory::count_star(), &["seg_0"]);
    let req = ServerQueryRequest {
        table_name: "nope_OFFLINE".into(),
        ..req
    };
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert_eq!(table.exceptions.len(), 1);
    assert_eq!(
        table.exceptions[0].error_code,
        QueryErrorCode::TableMissing
    );
}

#[tokio::test]
async fn scheduling_past_deadline_short_circuits_without_acquiring() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1, 2, 3])
            .create(),
    );
    let mut query = QueryFactory::count_star();
    query.options.set(options::TIMEOUT_MS, "1");
    let mut req = request(query, &["seg_0"]);
    req.arrival_time_ms = now_ms().saturating_sub(10);

    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert_eq!(table.exceptions.len(), 1);
    assert_eq!(
        table.exceptions[0].error_code,
        QueryErrorCode::SchedulingTimeout
    );
    assert_eq!(table_manager.outstanding_references(), 0);
}

#[tokio::test]
async fn metadata_count_sums_total_docs() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &(0..100).collect::<Vec<_>>())
            .create(),
    );
    table_manager.add_segment(
        SegmentFactory::new("seg_1")
            .with_long_column("n", &(0..250).collect::<Vec<_>>())
            .create(),
    );
    let req = request(QueryFactory::count_star(), &["seg_0", "seg_1"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;

    assert!(table.exceptions.is_empty());
    assert_eq!(table.rows, vec![vec![CellValue::Long(350)]]);
    assert_eq!(table.metadata_u64(keys::TOTAL_DOCS), Some(350));
    assert_eq!(table.metadata_u64(keys::NUM_SEGMENTS_PROCESSED), Some(0));
    assert_eq!(table_manager.outstanding_references(), 0);
}

#[tokio::test]
async fn dictionary_min_max_reads_endpoints() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("x", &[10, 20, 30, 40])
            .create(),
    );
    let req = request(QueryFactory::min_max("x"), &["seg_0"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert_eq!(
        table.rows,
        vec![vec![CellValue::Double(10.0), CellValue::Double(40.0)]]
    );
}

#[tokio::test]
async fn top_k_group_by_across_segments() {
    crate::logging::init_for_tests();
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_city_rows(&[("A", 1), ("B", 2), ("A", 3)])
            .create(),
    );
    table_manager.add_segment(
        SegmentFactory::new("seg_1")
            .with_city_rows(&[("B", 4), ("C", 5)])
            .create(),
    );
    let req = request(QueryFactory::sum_by_city_top_k(2), &["seg_0", "seg_1"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;

    assert!(table.exceptions.is_empty());
    assert_eq!(
        table.rows[0],
        vec![CellValue::String("B".into()), CellValue::Double(6.0)]
    );
    assert_eq!(
        table.rows[1],
        vec![CellValue::String("C".into()), CellValue::Double(5.0)]
    );
    assert_eq!(table_manager.outstanding_references(), 0);
}

#[tokio::test]
async fn missing_segments_are_legal_and_reported() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1])
            .create(),
    );
    let req = request(QueryFactory::count_star(), &["seg_0", "gone_1", "gone_2"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert!(table.exceptions.is_empty());
    assert_eq!(table.metadata_u64(keys::NUM_MISSING_SEGMENTS), Some(2));
    assert_eq!(table.metadata_u64(keys::NUM_SEGMENTS_QUERIED), Some(3));
}

#[tokio::test]
async fn pruned_to_empty_keeps_total_docs() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1, 2, 3])
            .create(),
    );
    let mut query = QueryFactory::select_columns(&["n"]);
    query.filter = Some(FilterContext::eq("n", CellValue::Long(99)));
    let req = request(query, &["seg_0"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;

    assert!(table.exceptions.is_empty());
    assert!(table.rows.is_empty());
    assert_eq!(table.metadata_u64(keys::TOTAL_DOCS), Some(3));
    assert_eq!(table.metadata_u64(keys::NUM_DOCS_SCANNED), Some(0));
    assert_eq!(table.metadata_u64(keys::NUM_SEGMENTS_PROCESSED), Some(0));
    assert_eq!(table_manager.outstanding_references(), 0);
}

#[tokio::test]
async fn consuming_segments_report_freshness() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1])
            .consuming(Some(5_000), 4_000)
            .create(),
    );
    table_manager.add_segment(
        SegmentFactory::new("seg_1")
            .with_long_column("n", &[2])
            .consuming(None, 3_000)
            .create(),
    );
    let req = request(QueryFactory::count_star(), &["seg_0", "seg_1"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert_eq!(
        table.metadata_u64(keys::NUM_CONSUMING_SEGMENTS_PROCESSED),
        Some(2)
    );
    // seg_1 has no ingestion time and falls back to its index time.
    assert_eq!(
        table.metadata_u64(keys::MIN_CONSUMING_FRESHNESS_TIME_MS),
        Some(3_000)
    );
}

#[tokio::test]
async fn invalid_order_by_is_an_execution_error() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_city_rows(&[("A", 1)])
            .create(),
    );
    let mut query = QueryFactory::sum_by_city_top_k(2);
    if let Some(order_by) = &mut query.order_by {
        order_by[0].expression =
            crate::engine::query::expr::ExpressionContext::identifier("unrelated");
    }
    let req = request(query, &["seg_0"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    assert_eq!(table.exceptions.len(), 1);
    assert_eq!(
        table.exceptions[0].error_code,
        QueryErrorCode::ExecutionError
    );
    assert_eq!(table_manager.outstanding_references(), 0);
}

#[tokio::test]
async fn decode_gate_is_fatal_to_request() {
    let (_instance, _table, executor) = setup();
    let result = executor
        .execute_encoded(&[0xba, 0xad], &mut TimerContext::new(), None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn encoded_round_trip_executes() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1, 2])
            .create(),
    );
    let bytes = request(QueryFactory::count_star(), &["seg_0"])
        .encode()
        .unwrap();
    let table = executor
        .execute_encoded(&bytes, &mut TimerContext::new(), None)
        .await
        .unwrap();
    assert_eq!(table.rows, vec![vec![CellValue::Long(2)]]);
}

#[tokio::test]
async fn trace_flag_attaches_phase_timings() {
    let (_instance, table_manager, executor) = setup();
    table_manager.add_segment(
        SegmentFactory::new("seg_0")
            .with_long_column("n", &[1])
            .create(),
    );
    let mut query = QueryFactory::count_star();
    query.trace_enabled = true;
    let req = request(query, &["seg_0"]);
    let table = executor.execute(&req, &mut TimerContext::new(), None).await;
    let trace = table.metadata.get(keys::TRACE_INFO).unwrap();
    assert!(trace.contains("QUERY_PROCESSING"));
}
