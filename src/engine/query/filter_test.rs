use crate::engine::query::filter::{FilterContext, Predicate, PredicateOp};
use crate::engine::types::CellValue;

fn resolve_one(column: &str, value: CellValue) -> impl Fn(&str) -> CellValue {
    let column = column.to_string();
    move |name: &str| {
        if name == column {
            value.clone()
        } else {
            CellValue::Null
        }
    }
}

#[test]
fn eq_predicate_matches_numeric_across_widths() {
    let filter = FilterContext::eq("n", CellValue::Long(5));
    assert!(filter.evaluate(&resolve_one("n", CellValue::Int(5))));
    assert!(!filter.evaluate(&resolve_one("n", CellValue::Long(6))));
}

#[test]
fn null_never_matches() {
    let filter = FilterContext::eq("n", CellValue::Long(5));
    assert!(!filter.evaluate(&resolve_one("other", CellValue::Long(5))));
}

#[test]
fn range_bounds_respect_inclusivity() {
    let filter = FilterContext::range(
        "n",
        Some((CellValue::Long(10), true)),
        Some((CellValue::Long(20), false)),
    );
    assert!(filter.evaluate(&resolve_one("n", CellValue::Long(10))));
    assert!(filter.evaluate(&resolve_one("n", CellValue::Long(19))));
    assert!(!filter.evaluate(&resolve_one("n", CellValue::Long(20))));
}

#[test]
fn and_or_compose() {
    let filter = FilterContext::Or(vec![
        FilterContext::eq("city", CellValue::String("A".into())),
        FilterContext::And(vec![
            FilterContext::eq("city", CellValue::String("B".into())),
            FilterContext::range("n", Some((CellValue::Long(1), true)), None),
        ]),
    ]);
    let resolve = |name: &str| match name {
        "city" => CellValue::String("B".into()),
        "n" => CellValue::Long(3),
        _ => CellValue::Null,
    };
    assert!(filter.evaluate(&resolve));
}

#[test]
fn conjunctive_walk_skips_or_branches() {
    let filter = FilterContext::And(vec![
        FilterContext::eq("a", CellValue::Long(1)),
        FilterContext::Or(vec![
            FilterContext::eq("b", CellValue::Long(2)),
            FilterContext::eq("c", CellValue::Long(3)),
        ]),
    ]);
    let mut seen: Vec<String> = Vec::new();
    filter.for_each_conjunctive_predicate(&mut |p: &Predicate| seen.push(p.column.clone()));
    assert_eq!(seen, vec!["a".to_string()]);
}

#[test]
fn in_predicate_matches_any_member() {
    let filter = FilterContext::Predicate(Predicate {
        column: "city".into(),
        op: PredicateOp::In(vec![
            CellValue::String("A".into()),
            CellValue::String("B".into()),
        ]),
    });
    assert!(filter.evaluate(&resolve_one("city", CellValue::String("B".into()))));
    assert!(!filter.evaluate(&resolve_one("city", CellValue::String("C".into()))));
}
