use std::sync::Arc;

use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::query::filter::FilterContext;
use crate::engine::segment::pruner::service::PrunerService;
use crate::engine::segment::source::Segment;
use crate::engine::types::{CellValue, ColumnType};

#[test]
fn kept_set_is_the_intersection_of_all_pruners() {
    let empty = Arc::new(Segment::builder("empty").build());
    let out_of_range = Arc::new(
        Segment::builder("low")
            .column("n", ColumnType::Long, vec![CellValue::Long(1)])
            .build(),
    );
    let matching = Arc::new(
        Segment::builder("hit")
            .column("n", ColumnType::Long, vec![CellValue::Long(50)])
            .build(),
    );
    let query = QueryContext::builder()
        .select(vec![ExpressionContext::identifier("n")])
        .filter(FilterContext::range(
            "n",
            Some((CellValue::Long(40), true)),
            None,
        ))
        .build();

    let kept = PrunerService::default().prune(vec![empty, out_of_range, matching], &query);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name(), "hit");
}
