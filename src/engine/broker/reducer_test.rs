use std::collections::HashMap;

use crate::engine::broker::reducer::{BrokerReducer, BrokerRequest};
use crate::engine::errors::ReduceError;
use crate::engine::executor::response::{DataTable, keys};
use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::{ExpressionContext, OrderByExpressionContext};
use crate::engine::query::options;
use crate::engine::types::{CellValue, ColumnType, DataSchema, ObjectValue};

fn sum_n() -> ExpressionContext {
    ExpressionContext::function("sum", vec![ExpressionContext::identifier("n")])
}

fn city_sum_schema() -> DataSchema {
    DataSchema::new(
        vec!["city".into(), "sum(n)".into()],
        vec![ColumnType::String, ColumnType::Double],
        1,
    )
}

fn city_sum_table(rows: &[(&str, f64)]) -> DataTable {
    DataTable::new(
        city_sum_schema(),
        rows.iter()
            .map(|(city, sum)| {
                vec![CellValue::String((*city).into()), CellValue::Double(*sum)]
            })
            .collect(),
    )
}

fn top_k_query(limit: usize) -> QueryContext {
    QueryContext::builder()
        .select(vec![ExpressionContext::identifier("city"), sum_n()])
        .group_by(vec![ExpressionContext::identifier("city")])
        .order_by(vec![OrderByExpressionContext::desc(sum_n())])
        .option(options::GROUP_BY_MODE, "sql")
        .option(options::RESPONSE_FORMAT, "sql")
        .limit(limit)
        .build()
}

fn servers(tables: Vec<DataTable>) -> HashMap<String, DataTable> {
    tables
        .into_iter()
        .enumerate()
        .map(|(i, t)| (format!("server_{}", i), t))
        .collect()
}

#[test]
fn empty_input_is_an_error() {
    let request = BrokerRequest {
        query: top_k_query(2),
        sql: true,
    };
    assert!(matches!(
        BrokerReducer::new().reduce(&request, HashMap::new()),
        Err(ReduceError::Empty)
    ));
}

#[test]
fn sql_sql_top_k_across_servers() {
    let request = BrokerRequest {
        query: top_k_query(2),
        sql: false,
    };
    let tables = servers(vec![
        city_sum_table(&[("A", 4.0), ("B", 2.0)]),
        city_sum_table(&[("B", 4.0), ("C", 5.0)]),
    ]);
    let response = BrokerReducer::new().reduce(&request, tables).unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![CellValue::String("B".into()), CellValue::Double(6.0)],
            vec![CellValue::String("C".into()), CellValue::Double(5.0)],
        ]
    );
}

#[test]
fn single_server_round_trips() {
    let request = BrokerRequest {
        query: top_k_query(10),
        sql: false,
    };
    let tables = servers(vec![city_sum_table(&[("A", 4.0), ("B", 6.0), ("C", 5.0)])]);
    let response = BrokerReducer::new().reduce(&request, tables).unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![CellValue::String("B".into()), CellValue::Double(6.0)],
            vec![CellValue::String("C".into()), CellValue::Double(5.0)],
            vec![CellValue::String("A".into()), CellValue::Double(4.0)],
        ]
    );
}

#[test]
fn sql_response_reorders_columns_to_select_order_and_ranks_post_final() {
    // Schema (g1, g2, avg(m)); the query selects (avg(m), g2, g1). The avg
    // intermediates rank differently from their sums, so ordering must use
    // the extracted final value.
    let schema = DataSchema::new(
        vec!["g1".into(), "g2".into(), "avg(m)".into()],
        vec![ColumnType::String, ColumnType::String, ColumnType::Object],
        2,
    );
    let avg = |sum: f64, count: i64| CellValue::Object(ObjectValue::AvgPair { sum, count });
    let row = |g1: &str, g2: &str, cell: CellValue| {
        vec![
            CellValue::String(g1.into()),
            CellValue::String(g2.into()),
            cell,
        ]
    };
    let table_a = DataTable::new(
        schema.clone(),
        vec![
            row("a", "x", avg(10.0, 2)), // avg 5
            row("b", "y", avg(9.0, 1)),  // avg 9
        ],
    );
    let table_b = DataTable::new(schema, vec![row("c", "z", avg(12.0, 4))]); // avg 3

    let avg_m = ExpressionContext::function("avg", vec![ExpressionContext::identifier("m")]);
    let query = QueryContext::builder()
        .select(vec![
            avg_m.clone(),
            ExpressionContext::identifier("g2"),
            ExpressionContext::identifier("g1"),
        ])
        .group_by(vec![
            ExpressionContext::identifier("g1"),
            ExpressionContext::identifier("g2"),
        ])
        .order_by(vec![OrderByExpressionContext::desc(avg_m)])
        .option(options::GROUP_BY_MODE, "sql")
        .option(options::RESPONSE_FORMAT, "sql")
        .limit(3)
        .build();
    let request = BrokerRequest { query, sql: true };

    let response = BrokerReducer::new()
        .reduce(&request, servers(vec![table_a, table_b]))
        .unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(
        result.schema.column_names,
        vec!["avg(m)".to_string(), "g2".to_string(), "g1".to_string()]
    );
    assert_eq!(
        result.rows,
        vec![
            vec![
                CellValue::Double(9.0),
                CellValue::String("y".into()),
                CellValue::String("b".into())
            ],
            vec![
                CellValue::Double(5.0),
                CellValue::String("x".into()),
                CellValue::String("a".into())
            ],
            vec![
                CellValue::Double(3.0),
                CellValue::String("z".into()),
                CellValue::String("c".into())
            ],
        ]
    );
}

#[test]
fn sql_pql_emits_one_group_list_per_aggregation() {
    let mut query = top_k_query(2);
    query.options.set(options::RESPONSE_FORMAT, "pql");
    let request = BrokerRequest { query, sql: false };
    let tables = servers(vec![
        city_sum_table(&[("A", 4.0), ("B", 2.0)]),
        city_sum_table(&[("B", 4.0), ("C", 5.0)]),
    ]);
    let response = BrokerReducer::new().reduce(&request, tables).unwrap();
    assert!(response.result_table.is_none());
    assert_eq!(response.aggregation_results.len(), 1);
    let agg = &response.aggregation_results[0];
    assert_eq!(agg.function, "sum(n)");
    assert_eq!(agg.group_by_columns, vec!["city".to_string()]);
    assert_eq!(agg.group_by_result.len(), 2);
    assert_eq!(agg.group_by_result[0].group, vec!["B".to_string()]);
    assert_eq!(agg.group_by_result[0].value, CellValue::Double(6.0));
}

#[test]
fn pql_sql_requires_exactly_one_aggregation() {
    let max_n = ExpressionContext::function("max", vec![ExpressionContext::identifier("n")]);
    let query = QueryContext::builder()
        .select(vec![
            ExpressionContext::identifier("city"),
            sum_n(),
            max_n,
        ])
        .group_by(vec![ExpressionContext::identifier("city")])
        .option(options::RESPONSE_FORMAT, "sql")
        .limit(5)
        .build();
    let schema = DataSchema::new(
        vec!["city".into(), "sum(n)".into(), "max(n)".into()],
        vec![ColumnType::String, ColumnType::Double, ColumnType::Double],
        1,
    );
    let table = DataTable::new(
        schema,
        vec![vec![
            CellValue::String("A".into()),
            CellValue::Double(1.0),
            CellValue::Double(1.0),
        ]],
    );
    let request = BrokerRequest { query, sql: false };
    assert!(matches!(
        BrokerReducer::new().reduce(&request, servers(vec![table])),
        Err(ReduceError::MultipleAggregations(2))
    ));
}

#[test]
fn pql_sql_trims_to_top_groups_by_value() {
    let query = QueryContext::builder()
        .select(vec![ExpressionContext::identifier("city"), sum_n()])
        .group_by(vec![ExpressionContext::identifier("city")])
        .option(options::RESPONSE_FORMAT, "sql")
        .limit(2)
        .build();
    let request = BrokerRequest { query, sql: false };
    let tables = servers(vec![
        city_sum_table(&[("A", 4.0), ("B", 2.0)]),
        city_sum_table(&[("B", 4.0), ("C", 5.0)]),
    ]);
    let response = BrokerReducer::new().reduce(&request, tables).unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![CellValue::String("B".into()), CellValue::Double(6.0)],
            vec![CellValue::String("C".into()), CellValue::Double(5.0)],
        ]
    );
}

#[test]
fn pql_pql_formats_values_when_preserve_type_is_off() {
    let query = QueryContext::builder()
        .select(vec![ExpressionContext::identifier("city"), sum_n()])
        .group_by(vec![ExpressionContext::identifier("city")])
        .option(options::PRESERVE_TYPE, "false")
        .limit(1)
        .build();
    let request = BrokerRequest { query, sql: false };
    let tables = servers(vec![city_sum_table(&[("A", 6.0), ("B", 2.5)])]);
    let response = BrokerReducer::new().reduce(&request, tables).unwrap();
    let agg = &response.aggregation_results[0];
    assert_eq!(agg.group_by_result.len(), 1);
    assert_eq!(
        agg.group_by_result[0].value,
        CellValue::String("6.00000".into())
    );
}

#[test]
fn aggregation_only_merges_across_servers() {
    let schema = DataSchema::new(vec!["sum(n)".into()], vec![ColumnType::Double], 0);
    let table = |v: f64| DataTable::new(schema.clone(), vec![vec![CellValue::Double(v)]]);
    let query = QueryContext::builder()
        .select(vec![sum_n()])
        .option(options::RESPONSE_FORMAT, "sql")
        .build();
    let request = BrokerRequest { query, sql: true };
    let response = BrokerReducer::new()
        .reduce(&request, servers(vec![table(4.0), table(11.0)]))
        .unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(result.rows, vec![vec![CellValue::Double(15.0)]]);
}

#[test]
fn selection_merges_and_limits() {
    let schema = DataSchema::new(vec!["n".into()], vec![ColumnType::Long], 0);
    let table = |values: &[i64]| {
        DataTable::new(
            schema.clone(),
            values.iter().map(|v| vec![CellValue::Long(*v)]).collect(),
        )
    };
    let query = QueryContext::builder()
        .select(vec![ExpressionContext::identifier("n")])
        .order_by(vec![OrderByExpressionContext::desc(
            ExpressionContext::identifier("n"),
        )])
        .limit(3)
        .build();
    let request = BrokerRequest { query, sql: true };
    let response = BrokerReducer::new()
        .reduce(&request, servers(vec![table(&[1, 5]), table(&[4, 2])]))
        .unwrap();
    let result = response.result_table.unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![CellValue::Long(5)],
            vec![CellValue::Long(4)],
            vec![CellValue::Long(2)],
        ]
    );
}

#[test]
fn stats_and_exceptions_aggregate_across_servers() {
    let mut a = city_sum_table(&[("A", 1.0)]);
    a.set_metadata(keys::TOTAL_DOCS, 100u64);
    a.set_metadata(keys::TIME_USED_MS, 5u64);
    let mut b = city_sum_table(&[("B", 2.0)]);
    b.set_metadata(keys::TOTAL_DOCS, 250u64);
    b.set_metadata(keys::TIME_USED_MS, 9u64);

    let request = BrokerRequest {
        query: top_k_query(5),
        sql: false,
    };
    let response = BrokerReducer::new()
        .reduce(&request, servers(vec![a, b]))
        .unwrap();
    assert_eq!(response.total_docs, 350);
    assert_eq!(response.time_used_ms, 9);
}
