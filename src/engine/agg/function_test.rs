use crate::engine::agg::AggregationFunction;
use crate::engine::query::expr::ExpressionContext;
use crate::engine::types::{CellValue, ColumnType, ObjectValue};

fn sum() -> AggregationFunction {
    AggregationFunction::Sum(ExpressionContext::identifier("n"))
}

#[test]
fn count_accepts_rows_and_merges() {
    let count = AggregationFunction::Count;
    let mut acc = count.initial_intermediate();
    count.accept(&mut acc, &CellValue::Null);
    count.accept(&mut acc, &CellValue::Long(7));
    assert_eq!(acc, CellValue::Long(2));
    assert_eq!(
        count.merge(&acc, &CellValue::Long(3)),
        CellValue::Long(5)
    );
}

#[test]
fn sum_skips_null_inputs() {
    let sum = sum();
    let mut acc = sum.initial_intermediate();
    sum.accept(&mut acc, &CellValue::Long(2));
    sum.accept(&mut acc, &CellValue::Null);
    sum.accept(&mut acc, &CellValue::Double(1.5));
    assert_eq!(acc, CellValue::Double(3.5));
}

#[test]
fn merge_is_identity_on_null() {
    let min = AggregationFunction::Min(ExpressionContext::identifier("x"));
    assert_eq!(
        min.merge(&CellValue::Null, &CellValue::Double(4.0)),
        CellValue::Double(4.0)
    );
    assert_eq!(
        min.merge(&CellValue::Double(4.0), &CellValue::Null),
        CellValue::Double(4.0)
    );
}

#[test]
fn minmaxrange_tracks_both_endpoints() {
    let range = AggregationFunction::MinMaxRange(ExpressionContext::identifier("x"));
    let mut acc = range.initial_intermediate();
    for v in [5, 1, 9] {
        range.accept(&mut acc, &CellValue::Long(v));
    }
    assert_eq!(
        acc,
        CellValue::Object(ObjectValue::MinMaxPair { min: 1.0, max: 9.0 })
    );
    assert_eq!(range.extract_final(&acc), CellValue::Double(8.0));
    assert!(!range.is_intermediate_comparable());
}

#[test]
fn avg_extracts_final_from_pair() {
    let avg = AggregationFunction::Avg(ExpressionContext::identifier("x"));
    let mut acc = avg.initial_intermediate();
    avg.accept(&mut acc, &CellValue::Long(4));
    avg.accept(&mut acc, &CellValue::Long(8));
    let merged = avg.merge(
        &acc,
        &CellValue::Object(ObjectValue::AvgPair { sum: 6.0, count: 1 }),
    );
    assert_eq!(avg.extract_final(&merged), CellValue::Double(6.0));
}

#[test]
fn avg_of_no_rows_is_zero() {
    let avg = AggregationFunction::Avg(ExpressionContext::identifier("x"));
    assert_eq!(
        avg.extract_final(&avg.initial_intermediate()),
        CellValue::Double(0.0)
    );
}

#[test]
fn distinctcount_merges_sets() {
    let dc = AggregationFunction::DistinctCount(ExpressionContext::identifier("x"));
    let mut a = dc.initial_intermediate();
    dc.accept(&mut a, &CellValue::String("u".into()));
    dc.accept(&mut a, &CellValue::String("v".into()));
    let mut b = dc.initial_intermediate();
    dc.accept(&mut b, &CellValue::String("v".into()));
    dc.accept(&mut b, &CellValue::String("w".into()));
    let merged = dc.merge(&a, &b);
    assert_eq!(dc.extract_final(&merged), CellValue::Long(3));
}

#[test]
fn intermediate_and_final_types() {
    let sum = sum();
    assert_eq!(sum.intermediate_type(), ColumnType::Double);
    assert_eq!(sum.final_result_column_type(), ColumnType::Double);
    let avg = AggregationFunction::Avg(ExpressionContext::identifier("x"));
    assert_eq!(avg.intermediate_type(), ColumnType::Object);
    assert_eq!(avg.final_result_column_type(), ColumnType::Double);
}
