use std::time::Duration;

use crate::engine::executor::timer::{QueryPhase, TimerContext};

#[test]
fn scheduler_wait_starts_at_construction() {
    let mut timer = TimerContext::new();
    std::thread::sleep(Duration::from_millis(2));
    timer.stop(QueryPhase::SchedulerWait);
    assert!(timer.duration(QueryPhase::SchedulerWait).is_some());
}

#[test]
fn unstarted_phases_report_zero() {
    let timer = TimerContext::new();
    assert_eq!(timer.duration_ms(QueryPhase::QueryPlanExecution), 0);
    assert!(timer.duration(QueryPhase::BuildQueryPlan).is_none());
}

#[test]
fn phases_time_independently() {
    let mut timer = TimerContext::new();
    timer.start(QueryPhase::SegmentPruning);
    timer.stop(QueryPhase::SegmentPruning);
    timer.start(QueryPhase::QueryPlanExecution);
    std::thread::sleep(Duration::from_millis(2));
    timer.stop(QueryPhase::QueryPlanExecution);
    assert!(
        timer.duration(QueryPhase::QueryPlanExecution).unwrap()
            >= timer.duration(QueryPhase::SegmentPruning).unwrap()
    );
}

#[test]
fn trace_info_lists_stopped_phases() {
    let mut timer = TimerContext::new();
    timer.stop(QueryPhase::SchedulerWait);
    timer.start(QueryPhase::QueryProcessing);
    timer.stop(QueryPhase::QueryProcessing);
    let info = timer.trace_info();
    assert!(info.contains("SCHEDULER_WAIT"));
    assert!(info.contains("QUERY_PROCESSING"));
    assert!(!info.contains("SEGMENT_PRUNING"));
}
