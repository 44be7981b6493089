use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::segment::pruner::empty_pruner::EmptySegmentPruner;
use crate::engine::segment::pruner::kind::SegmentPruner;
use crate::engine::segment::source::Segment;
use crate::engine::types::{CellValue, ColumnType};

#[test]
fn drops_segments_without_documents() {
    let query = QueryContext::builder()
        .select(vec![ExpressionContext::identifier("n")])
        .build();
    let empty = Segment::builder("empty").build();
    let full = Segment::builder("full")
        .column("n", ColumnType::Long, vec![CellValue::Long(1)])
        .build();
    assert!(!EmptySegmentPruner.keep(&empty, &query));
    assert!(EmptySegmentPruner.keep(&full, &query));
}
