use crate::engine::query::context::QueryContext;
use crate::engine::segment::pruner::kind::SegmentPruner;
use crate::engine::segment::source::Segment;

/// Drops segments with no documents at all.
pub struct EmptySegmentPruner;

impl SegmentPruner for EmptySegmentPruner {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn keep(&self, segment: &Segment, _query: &QueryContext) -> bool {
        segment.total_docs() > 0
    }
}
