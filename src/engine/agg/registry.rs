use std::collections::HashMap;

use crate::engine::agg::function::AggregationFunction;
use crate::engine::errors::QueryExecutionError;
use crate::engine::query::expr::{ExpressionContext, FunctionContext};

/// Legacy argument encoding: all arguments joined into one string under the
/// `column` key of an aggregationParams mapping.
pub const LEGACY_COLUMN_KEY: &str = "column";
pub const LEGACY_ARGS_SEPARATOR: char = '\t';

const NAMES: &[&str] = &[
    "count",
    "sum",
    "min",
    "max",
    "minmaxrange",
    "avg",
    "distinctcount",
];

pub fn is_aggregation_function(name: &str) -> bool {
    let lower = name.to_lowercase();
    NAMES.contains(&lower.as_str())
}

/// Builds a concrete aggregation function from a compiled function call.
pub fn from_function_context(
    function: &FunctionContext,
) -> Result<AggregationFunction, QueryExecutionError> {
    let args = &function.args;
    match function.name.to_lowercase().as_str() {
        "count" => Ok(AggregationFunction::Count),
        "sum" => Ok(AggregationFunction::Sum(single_arg("sum", args)?)),
        "min" => Ok(AggregationFunction::Min(single_arg("min", args)?)),
        "max" => Ok(AggregationFunction::Max(single_arg("max", args)?)),
        "minmaxrange" => Ok(AggregationFunction::MinMaxRange(single_arg(
            "minmaxrange",
            args,
        )?)),
        "avg" => Ok(AggregationFunction::Avg(single_arg("avg", args)?)),
        "distinctcount" => Ok(AggregationFunction::DistinctCount(single_arg(
            "distinctcount",
            args,
        )?)),
        other => Err(QueryExecutionError::UnknownAggregation(other.to_string())),
    }
}

/// Accepts both argument encodings: an ordered list of argument strings, or
/// the legacy single joined string under `column`.
pub fn from_name_and_params(
    name: &str,
    args: Option<&[String]>,
    params: Option<&HashMap<String, String>>,
) -> Result<AggregationFunction, QueryExecutionError> {
    let arg_strings: Vec<String> = match (args, params) {
        (Some(list), _) => list.to_vec(),
        (None, Some(map)) => map
            .get(LEGACY_COLUMN_KEY)
            .map(|joined| {
                joined
                    .split(LEGACY_ARGS_SEPARATOR)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default(),
        (None, None) => Vec::new(),
    };
    let expressions: Vec<ExpressionContext> = arg_strings
        .iter()
        .filter(|s| !s.is_empty() && s.as_str() != "*")
        .map(|s| ExpressionContext::identifier(s.clone()))
        .collect();
    from_function_context(&FunctionContext {
        name: name.to_lowercase(),
        args: expressions,
    })
}

fn single_arg(
    name: &str,
    args: &[ExpressionContext],
) -> Result<ExpressionContext, QueryExecutionError> {
    match args {
        [arg] => Ok(arg.clone()),
        _ => Err(QueryExecutionError::BadQueryRequest(format!(
            "{} expects exactly one argument, got {}",
            name,
            args.len()
        ))),
    }
}
