use crate::engine::types::{ColumnType, DataSchema};

#[test]
fn key_and_aggregation_split_is_explicit() {
    let schema = DataSchema::new(
        vec!["city".into(), "sum(n)".into()],
        vec![ColumnType::String, ColumnType::Double],
        1,
    );
    assert_eq!(schema.num_columns(), 2);
    assert_eq!(schema.num_aggregation_columns(), 1);
    assert!(!schema.is_aggregation_column(0));
    assert!(schema.is_aggregation_column(1));
    assert_eq!(schema.index_of("sum(n)"), Some(1));
}
