use crate::engine::query::context::QueryContext;
use crate::engine::query::expr::{ExpressionContext, OrderByExpressionContext};
use crate::engine::query::options;

/// Common query shapes for tests.
pub struct QueryFactory;

impl QueryFactory {
    pub fn sum_n() -> ExpressionContext {
        ExpressionContext::function("sum", vec![ExpressionContext::identifier("n")])
    }

    pub fn count_star() -> QueryContext {
        QueryContext::builder()
            .select(vec![ExpressionContext::function(
                "count",
                vec![ExpressionContext::identifier("*")],
            )])
            .build()
    }

    pub fn select_columns(columns: &[&str]) -> QueryContext {
        QueryContext::builder()
            .select(
                columns
                    .iter()
                    .map(|c| ExpressionContext::identifier(*c))
                    .collect(),
            )
            .limit(100)
            .build()
    }

    pub fn min_max(column: &str) -> QueryContext {
        QueryContext::builder()
            .select(vec![
                ExpressionContext::function("min", vec![ExpressionContext::identifier(column)]),
                ExpressionContext::function("max", vec![ExpressionContext::identifier(column)]),
            ])
            .build()
    }

    /// `select city, sum(n) group by city order by sum(n) desc limit <k>`
    /// in the sql/sql mode pair.
    pub fn sum_by_city_top_k(limit: usize) -> QueryContext {
        QueryContext::builder()
            .select(vec![ExpressionContext::identifier("city"), Self::sum_n()])
            .group_by(vec![ExpressionContext::identifier("city")])
            .order_by(vec![OrderByExpressionContext::desc(Self::sum_n())])
            .option(options::GROUP_BY_MODE, "sql")
            .option(options::RESPONSE_FORMAT, "sql")
            .limit(limit)
            .build()
    }
}
