use serde::{Deserialize, Serialize};

use crate::engine::errors::QueryExecutionError;
use crate::engine::query::expr::{ExpressionContext, FunctionContext, OrderByExpressionContext};
use crate::engine::query::filter::FilterContext;
use crate::engine::query::options::QueryOptions;

pub const DEFAULT_LIMIT: usize = 10;

/// Normalized, compiled query shape as it arrives at the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub select: Vec<ExpressionContext>,
    pub filter: Option<FilterContext>,
    pub group_by: Option<Vec<ExpressionContext>>,
    pub order_by: Option<Vec<OrderByExpressionContext>>,
    pub having: Option<FilterContext>,
    pub limit: usize,
    pub options: QueryOptions,
    pub trace_enabled: bool,
}

impl QueryContext {
    pub fn builder() -> QueryContextBuilder {
        QueryContextBuilder::default()
    }

    /// A query is an aggregation query when any select expression or any
    /// order-by expression is an aggregation function call.
    pub fn is_aggregation_query(&self) -> bool {
        self.select.iter().any(|e| e.is_aggregation())
            || self
                .order_by
                .iter()
                .flatten()
                .any(|o| o.expression.is_aggregation())
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn group_by_expressions(&self) -> &[ExpressionContext] {
        self.group_by.as_deref().unwrap_or(&[])
    }

    /// Aggregation expressions in select order, followed by order-by
    /// aggregations that are not already selected.
    pub fn aggregation_expressions(&self) -> Vec<FunctionContext> {
        let mut out: Vec<FunctionContext> = Vec::new();
        for expr in &self.select {
            if expr.is_aggregation() {
                if let Some(f) = expr.as_function() {
                    if !out.contains(f) {
                        out.push(f.clone());
                    }
                }
            }
        }
        for order in self.order_by.iter().flatten() {
            if order.expression.is_aggregation() {
                if let Some(f) = order.expression.as_function() {
                    if !out.contains(f) {
                        out.push(f.clone());
                    }
                }
            }
        }
        out
    }

    pub fn timeout_override_ms(&self) -> Option<u64> {
        self.options.timeout_ms()
    }

    /// Every order-by expression must reference either a group-by expression
    /// or an aggregation expression.
    pub fn validate(&self) -> Result<(), QueryExecutionError> {
        if let Some(order_by) = &self.order_by {
            if self.group_by.is_some() {
                for order in order_by {
                    let in_group_by = self
                        .group_by_expressions()
                        .iter()
                        .any(|g| *g == order.expression);
                    if !in_group_by && !order.expression.is_aggregation() {
                        return Err(QueryExecutionError::UnresolvedOrderBy(
                            order.expression.label(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct QueryContextBuilder {
    select: Vec<ExpressionContext>,
    filter: Option<FilterContext>,
    group_by: Option<Vec<ExpressionContext>>,
    order_by: Option<Vec<OrderByExpressionContext>>,
    having: Option<FilterContext>,
    limit: Option<usize>,
    options: QueryOptions,
    trace_enabled: bool,
}

impl QueryContextBuilder {
    pub fn select(mut self, expressions: Vec<ExpressionContext>) -> Self {
        self.select = expressions;
        self
    }

    pub fn filter(mut self, filter: FilterContext) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn group_by(mut self, expressions: Vec<ExpressionContext>) -> Self {
        self.group_by = Some(expressions);
        self
    }

    pub fn order_by(mut self, expressions: Vec<OrderByExpressionContext>) -> Self {
        self.order_by = Some(expressions);
        self
    }

    pub fn having(mut self, filter: FilterContext) -> Self {
        self.having = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn option(mut self, key: &str, value: &str) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    pub fn build(self) -> QueryContext {
        QueryContext {
            select: self.select,
            filter: self.filter,
            group_by: self.group_by,
            order_by: self.order_by,
            having: self.having,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            options: self.options,
            trace_enabled: self.trace_enabled,
        }
    }
}
