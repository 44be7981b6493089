use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::segment::source::Segment;

/// The leaf plan kinds one segment can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Selection,
    /// Aggregation group-by with the ordered, trimmed pipeline.
    GroupByOrderBy,
    /// Legacy per-aggregation group-by pipeline.
    GroupBy,
    /// count()-only without filter, answered from segment metadata.
    MetadataAgg,
    /// min/max/minmaxrange without filter over sorted-dictionary columns,
    /// answered from dictionary endpoints.
    DictionaryAgg,
    /// Filtered scan, the aggregation default.
    ScanAgg,
}

/// Pure function of the query shape and the segment's capabilities.
pub fn select_plan_kind(query: &QueryContext, segment: &Segment) -> PlanKind {
    if !query.is_aggregation_query() {
        return PlanKind::Selection;
    }
    if query.group_by.is_some() {
        return if query.options.group_by_mode_sql() {
            PlanKind::GroupByOrderBy
        } else {
            PlanKind::GroupBy
        };
    }
    if !query.has_filter() {
        if query.select.iter().all(is_count_star) {
            return PlanKind::MetadataAgg;
        }
        if query
            .select
            .iter()
            .all(|e| is_dictionary_answerable(e, segment))
        {
            return PlanKind::DictionaryAgg;
        }
    }
    PlanKind::ScanAgg
}

fn is_count_star(expr: &ExpressionContext) -> bool {
    match expr.as_function() {
        Some(f) if f.name == "count" => f
            .args
            .iter()
            .all(|arg| arg.as_identifier() == Some("*")),
        _ => false,
    }
}

fn is_dictionary_answerable(expr: &ExpressionContext, segment: &Segment) -> bool {
    let Some(f) = expr.as_function() else {
        return false;
    };
    if !matches!(f.name.as_str(), "min" | "max" | "minmaxrange") {
        return false;
    }
    let [arg] = f.args.as_slice() else {
        return false;
    };
    let Some(column) = arg.as_identifier() else {
        return false;
    };
    segment
        .column(column)
        .is_some_and(|c| c.has_sorted_dictionary())
}
