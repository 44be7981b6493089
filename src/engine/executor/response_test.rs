use crate::engine::executor::response::{
    DataTable, QueryErrorCode, QueryException, keys,
};
use crate::engine::types::{CellValue, ColumnType, DataSchema};

#[test]
fn data_tables_round_trip_through_the_wire_encoding() {
    let schema = DataSchema::new(
        vec!["city".into(), "sum(n)".into()],
        vec![ColumnType::String, ColumnType::Double],
        1,
    );
    let mut table = DataTable::new(
        schema,
        vec![vec![CellValue::String("A".into()), CellValue::Double(4.0)]],
    );
    table.set_metadata(keys::TOTAL_DOCS, 42u64);
    table.exceptions.push(QueryException::new(
        QueryErrorCode::DeadlineExceeded,
        "partial",
    ));

    let bytes = table.encode().unwrap();
    let back = DataTable::decode(&bytes).unwrap();
    assert_eq!(table, back);
    assert_eq!(back.metadata_u64(keys::TOTAL_DOCS), Some(42));
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(QueryErrorCode::InvalidArgument.code(), 100);
    assert_eq!(QueryErrorCode::SchedulingTimeout.code(), 190);
    assert_eq!(QueryErrorCode::ExecutionError.code(), 200);
    assert_eq!(QueryErrorCode::TableMissing.code(), 230);
    assert_eq!(
        QueryErrorCode::TableMissing.name(),
        "SERVER_TABLE_MISSING_ERROR"
    );
}

#[test]
fn fatal_errors_map_to_transport_codes() {
    use crate::engine::errors::QueryExecutionError;

    assert_eq!(
        QueryErrorCode::from_execution_error(&QueryExecutionError::RequestDecode("bad".into())),
        QueryErrorCode::InvalidArgument
    );
    assert_eq!(
        QueryErrorCode::from_execution_error(&QueryExecutionError::ResponseSerialization(
            "oops".into()
        )),
        QueryErrorCode::Internal
    );
}

#[test]
fn empty_tables_carry_no_columns() {
    let table = DataTable::empty();
    assert_eq!(table.schema.num_columns(), 0);
    assert!(table.rows.is_empty());
}
