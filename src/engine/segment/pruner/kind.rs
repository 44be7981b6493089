use crate::engine::query::context::QueryContext;
use crate::engine::segment::source::Segment;

/// A pruning rule over segment metadata only. Implementations may be
/// conservative (keep a segment that contributes nothing) but never unsafe
/// (drop one that would contribute a row). Cost must stay constant in the
/// segment's row count.
pub trait SegmentPruner: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when the segment may still contribute at least one row.
    fn keep(&self, segment: &Segment, query: &QueryContext) -> bool;
}
