use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::engine::agg::{AggregationFunction, registry};
use crate::engine::broker::format::format_value;
use crate::engine::broker::response::{
    AggregationResult, BrokerResponse, GroupByEntry, ResultTable,
};
use crate::engine::errors::ReduceError;
use crate::engine::executor::response::{DataTable, keys};
use crate::engine::plan::maker::PlanMakerConfig;
use crate::engine::query::context::QueryContext;
use crate::engine::table::indexed::ConcurrentIndexedTable;
use crate::engine::table::order::resolve_order_by;
use crate::engine::types::{CellValue, ColumnType, DataSchema, Key, Record};

/// The query as the broker parsed it, plus whether the original text was
/// SQL; SQL responses reorder columns to match the select list.
#[derive(Debug, Clone)]
pub struct BrokerRequest {
    pub query: QueryContext,
    pub sql: bool,
}

/// Merges per-server DataTables into the final response, routing group-by
/// queries on `(groupByMode, responseFormat)`.
pub struct BrokerReducer {
    config: PlanMakerConfig,
}

impl Default for BrokerReducer {
    fn default() -> Self {
        Self::with_config(PlanMakerConfig::default())
    }
}

impl BrokerReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlanMakerConfig) -> Self {
        Self { config }
    }

    pub fn reduce(
        &self,
        request: &BrokerRequest,
        tables: HashMap<String, DataTable>,
    ) -> Result<BrokerResponse, ReduceError> {
        if tables.is_empty() {
            return Err(ReduceError::Empty);
        }
        let mut response = BrokerResponse::default();
        collect_stats(&tables, &mut response);

        let data: Vec<&DataTable> = tables
            .values()
            .filter(|t| t.schema.num_columns() > 0)
            .collect();
        if data.is_empty() {
            return Ok(response);
        }
        let schema = data[0].schema.clone();
        for table in &data {
            if table.schema.column_names != schema.column_names {
                return Err(ReduceError::SchemaMismatch(format!(
                    "{:?} vs {:?}",
                    table.schema.column_names, schema.column_names
                )));
            }
        }
        debug!(
            target: "stratodb::broker",
            servers = tables.len(),
            data_tables = data.len(),
            "Reducing server responses"
        );

        let query = &request.query;
        if !query.is_aggregation_query() {
            self.reduce_selection(query, schema, &data, &mut response);
            return Ok(response);
        }

        let agg_functions: Vec<AggregationFunction> = query
            .aggregation_expressions()
            .iter()
            .map(registry::from_function_context)
            .collect::<Result<_, _>>()
            .map_err(|e| ReduceError::UnknownAggregation(e.to_string()))?;

        if query.group_by.is_none() {
            self.reduce_aggregation_only(query, &agg_functions, &data, &mut response);
            return Ok(response);
        }

        match (
            query.options.group_by_mode_sql(),
            query.options.response_format_sql(),
        ) {
            (true, true) => {
                self.reduce_group_by_sql_sql(request, &agg_functions, schema, &data, &mut response)?
            }
            (true, false) => {
                self.reduce_group_by_sql_pql(query, &agg_functions, schema, &data, &mut response)?
            }
            (false, true) => {
                self.reduce_group_by_pql_sql(query, &agg_functions, schema, &data, &mut response)?
            }
            (false, false) => {
                self.reduce_group_by_pql_pql(query, &agg_functions, schema, &data, &mut response)?
            }
        }
        Ok(response)
    }

    fn reduce_selection(
        &self,
        query: &QueryContext,
        schema: DataSchema,
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) {
        let mut rows: Vec<Record> = data.iter().flat_map(|t| t.rows.iter().cloned()).collect();
        if let Some(order_by) = &query.order_by {
            let sort: Vec<(usize, bool)> = order_by
                .iter()
                .filter_map(|o| {
                    query
                        .select
                        .iter()
                        .position(|e| *e == o.expression)
                        .map(|i| (i, o.descending))
                })
                .collect();
            rows.sort_by(|a, b| {
                for (index, descending) in &sort {
                    let ord = a[*index].compare(&b[*index]);
                    let ord = if *descending { ord.reverse() } else { ord };
                    if !ord.is_eq() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }
        rows.truncate(query.limit);
        response.result_table = Some(ResultTable { schema, rows });
    }

    fn reduce_aggregation_only(
        &self,
        query: &QueryContext,
        agg_functions: &[AggregationFunction],
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) {
        let mut merged: Option<Record> = None;
        for table in data {
            let Some(incoming) = table.rows.first() else {
                continue;
            };
            match &mut merged {
                None => merged = Some(incoming.clone()),
                Some(existing) => {
                    for (i, function) in agg_functions.iter().enumerate() {
                        existing[i] = function.merge(&existing[i], &incoming[i]);
                    }
                }
            }
        }
        let intermediates =
            merged.unwrap_or_else(|| agg_functions.iter().map(|f| f.initial_intermediate()).collect());
        let finals: Vec<CellValue> = agg_functions
            .iter()
            .zip(intermediates.iter())
            .map(|(f, v)| f.extract_final(v))
            .collect();

        if query.options.response_format_sql() {
            let schema = DataSchema::new(
                agg_functions.iter().map(|f| f.column_label()).collect(),
                agg_functions
                    .iter()
                    .map(|f| f.final_result_column_type())
                    .collect(),
                0,
            );
            response.result_table = Some(ResultTable {
                schema,
                rows: vec![finals],
            });
        } else {
            let preserve = query.options.preserve_type();
            response.aggregation_results = agg_functions
                .iter()
                .zip(finals)
                .map(|(function, value)| AggregationResult {
                    function: function.column_label(),
                    value: Some(present(value, preserve)),
                    group_by_columns: Vec::new(),
                    group_by_result: Vec::new(),
                })
                .collect();
        }
    }

    /// Shared sql-mode merge: one indexed table over every server's rows,
    /// iterated in sorted order up to the limit, finals extracted.
    fn merge_sql_groups(
        &self,
        query: &QueryContext,
        agg_functions: &[AggregationFunction],
        schema: &DataSchema,
        data: &[&DataTable],
    ) -> Result<Vec<Record>, ReduceError> {
        let resolved = match &query.order_by {
            Some(order_by) => Some(
                resolve_order_by(
                    order_by,
                    query.group_by_expressions(),
                    &query.aggregation_expressions(),
                    agg_functions,
                )
                .map_err(|e| ReduceError::OrderBy(e.to_string()))?,
            ),
            None => None,
        };
        let table = ConcurrentIndexedTable::new(
            schema.clone(),
            Arc::new(agg_functions.to_vec()),
            resolved,
            query.limit,
            self.config.max_initial_holder_capacity,
            self.config.num_groups_limit,
        );
        let num_keys = schema.num_key_columns;
        for data_table in data {
            for record in &data_table.rows {
                table.upsert(Key::from_record(record, num_keys), record.clone());
            }
        }
        table.finish(query.order_by.is_some());
        let mut rows = table.take_rows();

        // Finals first, then having, then the limit.
        for record in &mut rows {
            for (i, function) in agg_functions.iter().enumerate() {
                let col = num_keys + i;
                record[col] = function.extract_final(&record[col]);
            }
        }
        if let Some(having) = &query.having {
            let index: HashMap<&str, usize> = schema
                .column_names
                .iter()
                .enumerate()
                .map(|(i, n)| (n.as_str(), i))
                .collect();
            rows.retain(|record| {
                let resolve = |name: &str| {
                    index
                        .get(name)
                        .map(|i| record[*i].clone())
                        .unwrap_or(CellValue::Null)
                };
                having.evaluate(&resolve)
            });
        }
        rows.truncate(query.limit);
        Ok(rows)
    }

    fn final_schema(
        &self,
        schema: &DataSchema,
        agg_functions: &[AggregationFunction],
    ) -> DataSchema {
        let num_keys = schema.num_key_columns;
        let types: Vec<ColumnType> = schema
            .column_types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if i < num_keys {
                    *t
                } else {
                    agg_functions[i - num_keys].final_result_column_type()
                }
            })
            .collect();
        DataSchema::new(schema.column_names.clone(), types, num_keys)
    }

    fn reduce_group_by_sql_sql(
        &self,
        request: &BrokerRequest,
        agg_functions: &[AggregationFunction],
        schema: DataSchema,
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) -> Result<(), ReduceError> {
        let query = &request.query;
        let rows = self.merge_sql_groups(query, agg_functions, &schema, data)?;
        let final_schema = self.final_schema(&schema, agg_functions);

        if request.sql {
            // SQL responses present columns in select-expression order:
            // identifiers map into the group-by prefix, aggregations to the
            // positions after it.
            if let Some(mapping) = select_to_schema_mapping(query, schema.num_key_columns) {
                let names = mapping
                    .iter()
                    .map(|i| final_schema.column_names[*i].clone())
                    .collect();
                let types = mapping
                    .iter()
                    .map(|i| final_schema.column_types[*i])
                    .collect();
                let reordered_rows = rows
                    .into_iter()
                    .map(|record| mapping.iter().map(|i| record[*i].clone()).collect())
                    .collect();
                response.result_table = Some(ResultTable {
                    schema: DataSchema::new(names, types, 0),
                    rows: reordered_rows,
                });
                return Ok(());
            }
        }
        response.result_table = Some(ResultTable {
            schema: final_schema,
            rows,
        });
        Ok(())
    }

    fn reduce_group_by_sql_pql(
        &self,
        query: &QueryContext,
        agg_functions: &[AggregationFunction],
        schema: DataSchema,
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) -> Result<(), ReduceError> {
        let rows = self.merge_sql_groups(query, agg_functions, &schema, data)?;
        let num_keys = schema.num_key_columns;
        let preserve = query.options.preserve_type();
        let group_by_columns: Vec<String> = schema.column_names[..num_keys].to_vec();

        // One result list per aggregation, all sharing the same groups.
        response.aggregation_results = agg_functions
            .iter()
            .enumerate()
            .map(|(i, function)| AggregationResult {
                function: function.column_label(),
                value: None,
                group_by_columns: group_by_columns.clone(),
                group_by_result: rows
                    .iter()
                    .map(|record| GroupByEntry {
                        group: key_strings(record, num_keys),
                        value: present(record[num_keys + i].clone(), preserve),
                    })
                    .collect(),
            })
            .collect();
        Ok(())
    }

    /// Legacy merge: per-aggregation intermediate maps, each aggregation
    /// trimmed to its own top groups by final value.
    fn merge_legacy_groups(
        &self,
        agg_functions: &[AggregationFunction],
        schema: &DataSchema,
        data: &[&DataTable],
    ) -> HashMap<Key, Vec<CellValue>, ahash::RandomState> {
        let num_keys = schema.num_key_columns;
        let mut groups: HashMap<Key, Vec<CellValue>, ahash::RandomState> = HashMap::default();
        for data_table in data {
            for record in &data_table.rows {
                let key = Key::from_record(record, num_keys);
                let intermediates = &record[num_keys..];
                match groups.get_mut(&key) {
                    Some(existing) => {
                        for (i, function) in agg_functions.iter().enumerate() {
                            existing[i] = function.merge(&existing[i], &intermediates[i]);
                        }
                    }
                    None => {
                        if groups.len() < self.config.num_groups_limit {
                            groups.insert(key, intermediates.to_vec());
                        }
                    }
                }
            }
        }
        groups
    }

    fn legacy_top_groups(
        &self,
        function: &AggregationFunction,
        index: usize,
        groups: &HashMap<Key, Vec<CellValue>, ahash::RandomState>,
        limit: usize,
    ) -> Vec<(Key, CellValue)> {
        let mut finals: Vec<(Key, CellValue)> = groups
            .iter()
            .map(|(key, intermediates)| (key.clone(), function.extract_final(&intermediates[index])))
            .collect();
        // Legacy presentation ranks each aggregation's groups by value,
        // largest first; group text breaks ties.
        finals.sort_by(|(key_a, value_a), (key_b, value_b)| {
            value_b
                .compare(value_a)
                .then_with(|| format!("{:?}", key_a.values()).cmp(&format!("{:?}", key_b.values())))
        });
        finals.truncate(limit);
        finals
    }

    fn reduce_group_by_pql_sql(
        &self,
        query: &QueryContext,
        agg_functions: &[AggregationFunction],
        schema: DataSchema,
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) -> Result<(), ReduceError> {
        if agg_functions.len() != 1 {
            return Err(ReduceError::MultipleAggregations(agg_functions.len()));
        }
        let function = &agg_functions[0];
        let groups = self.merge_legacy_groups(agg_functions, &schema, data);
        let top = self.legacy_top_groups(function, 0, &groups, query.limit);

        let num_keys = schema.num_key_columns;
        let mut names: Vec<String> = schema.column_names[..num_keys].to_vec();
        names.push(function.column_label());
        let mut types: Vec<ColumnType> = schema.column_types[..num_keys].to_vec();
        types.push(function.final_result_column_type());
        let rows = top
            .into_iter()
            .map(|(key, value)| {
                let mut record: Record = key.values().to_vec();
                record.push(value);
                record
            })
            .collect();
        response.result_table = Some(ResultTable {
            schema: DataSchema::new(names, types, num_keys),
            rows,
        });
        Ok(())
    }

    fn reduce_group_by_pql_pql(
        &self,
        query: &QueryContext,
        agg_functions: &[AggregationFunction],
        schema: DataSchema,
        data: &[&DataTable],
        response: &mut BrokerResponse,
    ) -> Result<(), ReduceError> {
        let groups = self.merge_legacy_groups(agg_functions, &schema, data);
        let num_keys = schema.num_key_columns;
        let preserve = query.options.preserve_type();
        let group_by_columns: Vec<String> = schema.column_names[..num_keys].to_vec();

        response.aggregation_results = agg_functions
            .iter()
            .enumerate()
            .map(|(i, function)| AggregationResult {
                function: function.column_label(),
                value: None,
                group_by_columns: group_by_columns.clone(),
                group_by_result: self
                    .legacy_top_groups(function, i, &groups, query.limit)
                    .into_iter()
                    .map(|(key, value)| GroupByEntry {
                        group: key.values().iter().map(|v| v.to_string()).collect(),
                        value: present(value, preserve),
                    })
                    .collect(),
            })
            .collect();
        Ok(())
    }
}

/// Maps select expressions to merged-schema positions: identifier
/// expressions to their group-by position, aggregations to successive
/// positions after the group-by columns. None when any select expression
/// cannot be mapped.
fn select_to_schema_mapping(query: &QueryContext, num_keys: usize) -> Option<Vec<usize>> {
    let group_by = query.group_by_expressions();
    let agg_expressions = query.aggregation_expressions();
    let mut mapping = Vec::with_capacity(query.select.len());
    for expr in &query.select {
        if let Some(pos) = group_by.iter().position(|g| g == expr) {
            mapping.push(pos);
        } else if let Some(f) = expr.as_function() {
            let pos = agg_expressions.iter().position(|a| a == f)?;
            mapping.push(num_keys + pos);
        } else {
            return None;
        }
    }
    Some(mapping)
}

fn key_strings(record: &Record, num_keys: usize) -> Vec<String> {
    record[..num_keys].iter().map(|v| v.to_string()).collect()
}

fn present(value: CellValue, preserve_type: bool) -> CellValue {
    if preserve_type {
        value
    } else {
        CellValue::String(format_value(&value))
    }
}

fn collect_stats(tables: &HashMap<String, DataTable>, response: &mut BrokerResponse) {
    for table in tables.values() {
        response.exceptions.extend(table.exceptions.iter().cloned());
        response.total_docs += table.metadata_u64(keys::TOTAL_DOCS).unwrap_or(0);
        response.num_docs_scanned += table.metadata_u64(keys::NUM_DOCS_SCANNED).unwrap_or(0);
        response.num_entries_scanned_in_filter += table
            .metadata_u64(keys::NUM_ENTRIES_SCANNED_IN_FILTER)
            .unwrap_or(0);
        response.num_entries_scanned_post_filter += table
            .metadata_u64(keys::NUM_ENTRIES_SCANNED_POST_FILTER)
            .unwrap_or(0);
        response.num_segments_processed += table
            .metadata_u64(keys::NUM_SEGMENTS_PROCESSED)
            .unwrap_or(0);
        response.num_segments_matched += table
            .metadata_u64(keys::NUM_SEGMENTS_MATCHED)
            .unwrap_or(0);
        response.num_segments_queried += table
            .metadata_u64(keys::NUM_SEGMENTS_QUERIED)
            .unwrap_or(0);
        response.time_used_ms = response
            .time_used_ms
            .max(table.metadata_u64(keys::TIME_USED_MS).unwrap_or(0));
    }
}
