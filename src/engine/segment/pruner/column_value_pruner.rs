use crate::engine::query::context::QueryContext;
use crate::engine::query::filter::{Predicate, PredicateOp};
use crate::engine::segment::pruner::kind::SegmentPruner;
use crate::engine::segment::source::Segment;
use crate::engine::types::CellValue;

/// Prunes on per-column min/max metadata. Only predicates every matching
/// row must satisfy (the AND-reachable ones) are considered; a single
/// provably-unsatisfiable predicate rules the whole segment out.
pub struct ColumnValuePruner;

impl SegmentPruner for ColumnValuePruner {
    fn name(&self) -> &'static str {
        "column_value"
    }

    fn keep(&self, segment: &Segment, query: &QueryContext) -> bool {
        let Some(filter) = &query.filter else {
            return true;
        };
        let mut keep = true;
        filter.for_each_conjunctive_predicate(&mut |predicate: &Predicate| {
            if keep && !may_match(segment, predicate) {
                keep = false;
            }
        });
        keep
    }
}

fn may_match(segment: &Segment, predicate: &Predicate) -> bool {
    let Some(meta) = segment.column_metadata(&predicate.column) else {
        // Column absent: the predicate can never hold, no row matches.
        return false;
    };
    let (Some(min), Some(max)) = (meta.min, meta.max) else {
        // All-null column. Predicates never match null.
        return false;
    };
    match &predicate.op {
        PredicateOp::Eq(value) => within(value, &min, &max),
        PredicateOp::In(values) => values.iter().any(|v| within(v, &min, &max)),
        PredicateOp::NotEq(_) => true,
        PredicateOp::Range { lower, upper } => {
            if let Some(bound) = lower {
                let ord = max.compare(&bound.value);
                if ord.is_lt() || (ord.is_eq() && !bound.inclusive) {
                    return false;
                }
            }
            if let Some(bound) = upper {
                let ord = min.compare(&bound.value);
                if ord.is_gt() || (ord.is_eq() && !bound.inclusive) {
                    return false;
                }
            }
            true
        }
    }
}

fn within(value: &CellValue, min: &CellValue, max: &CellValue) -> bool {
    !value.compare(min).is_lt() && !value.compare(max).is_gt()
}
