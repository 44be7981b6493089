use std::sync::Arc;

use tracing::debug;

use crate::engine::query::context::QueryContext;
use crate::engine::segment::pruner::column_value_pruner::ColumnValuePruner;
use crate::engine::segment::pruner::empty_pruner::EmptySegmentPruner;
use crate::engine::segment::pruner::kind::SegmentPruner;
use crate::engine::segment::source::Segment;

/// Runs every registered pruner and keeps the intersection of their kept
/// sets: a segment survives only when every pruner keeps it.
pub struct PrunerService {
    pruners: Vec<Box<dyn SegmentPruner>>,
}

impl Default for PrunerService {
    fn default() -> Self {
        Self {
            pruners: vec![Box::new(EmptySegmentPruner), Box::new(ColumnValuePruner)],
        }
    }
}

impl PrunerService {
    pub fn new(pruners: Vec<Box<dyn SegmentPruner>>) -> Self {
        Self { pruners }
    }

    pub fn prune(&self, segments: Vec<Arc<Segment>>, query: &QueryContext) -> Vec<Arc<Segment>> {
        let before = segments.len();
        let kept: Vec<Arc<Segment>> = segments
            .into_iter()
            .filter(|segment| {
                for pruner in &self.pruners {
                    if !pruner.keep(segment, query) {
                        debug!(
                            target: "stratodb::pruner",
                            segment = segment.name(),
                            pruner = pruner.name(),
                            "Segment pruned"
                        );
                        return false;
                    }
                }
                true
            })
            .collect();
        if kept.len() < before {
            debug!(
                target: "stratodb::pruner",
                kept = kept.len(),
                pruned = before - kept.len(),
                "Segment pruning finished"
            );
        }
        kept
    }
}
