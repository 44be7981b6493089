use std::time::{Duration, Instant};

/// Per-query execution phases, timed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    SchedulerWait,
    QueryProcessing,
    SegmentPruning,
    BuildQueryPlan,
    QueryPlanExecution,
}

const NUM_PHASES: usize = 5;

impl QueryPhase {
    fn index(&self) -> usize {
        match self {
            QueryPhase::SchedulerWait => 0,
            QueryPhase::QueryProcessing => 1,
            QueryPhase::SegmentPruning => 2,
            QueryPhase::BuildQueryPlan => 3,
            QueryPhase::QueryPlanExecution => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryPhase::SchedulerWait => "SCHEDULER_WAIT",
            QueryPhase::QueryProcessing => "QUERY_PROCESSING",
            QueryPhase::SegmentPruning => "SEGMENT_PRUNING",
            QueryPhase::BuildQueryPlan => "BUILD_QUERY_PLAN",
            QueryPhase::QueryPlanExecution => "QUERY_PLAN_EXECUTION",
        }
    }

    fn all() -> [QueryPhase; NUM_PHASES] {
        [
            QueryPhase::SchedulerWait,
            QueryPhase::QueryProcessing,
            QueryPhase::SegmentPruning,
            QueryPhase::BuildQueryPlan,
            QueryPhase::QueryPlanExecution,
        ]
    }
}

/// Monotonic phase timers for one query. The scheduler-wait timer starts at
/// construction; the rest are started and stopped explicitly.
#[derive(Debug)]
pub struct TimerContext {
    started: [Option<Instant>; NUM_PHASES],
    durations: [Option<Duration>; NUM_PHASES],
}

impl TimerContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            started: [None; NUM_PHASES],
            durations: [None; NUM_PHASES],
        };
        ctx.start(QueryPhase::SchedulerWait);
        ctx
    }

    pub fn start(&mut self, phase: QueryPhase) {
        self.started[phase.index()] = Some(Instant::now());
    }

    pub fn stop(&mut self, phase: QueryPhase) {
        if let Some(start) = self.started[phase.index()].take() {
            self.durations[phase.index()] = Some(start.elapsed());
        }
    }

    pub fn duration(&self, phase: QueryPhase) -> Option<Duration> {
        self.durations[phase.index()]
    }

    pub fn duration_ms(&self, phase: QueryPhase) -> u64 {
        self.duration(phase).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    /// Phase timings as a JSON object string, attached to response metadata
    /// when tracing is on.
    pub fn trace_info(&self) -> String {
        let mut map = serde_json::Map::new();
        for phase in QueryPhase::all() {
            if let Some(duration) = self.duration(phase) {
                map.insert(
                    phase.name().to_string(),
                    serde_json::Value::from(duration.as_millis() as u64),
                );
            }
        }
        serde_json::Value::Object(map).to_string()
    }
}

impl Default for TimerContext {
    fn default() -> Self {
        Self::new()
    }
}
