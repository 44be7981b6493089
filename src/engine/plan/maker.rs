use std::sync::Arc;

use tracing::warn;

use crate::engine::agg::{AggregationFunction, registry};
use crate::engine::errors::QueryExecutionError;
use crate::engine::plan::combine::CombinePlan;
use crate::engine::plan::instance::InstanceResponsePlan;
use crate::engine::plan::leaf::{
    LeafPlan, aggregation_schema, group_by_schema, selection_schema,
};
use crate::engine::plan::selector::select_plan_kind;
use crate::engine::query::context::QueryContext;
use crate::engine::segment::source::Segment;
use crate::engine::types::DataSchema;
use crate::shared::config::CONFIG;

/// Plan-maker knobs. The holder capacity may never exceed the groups limit;
/// out-of-line configurations are clamped at construction.
#[derive(Debug, Clone)]
pub struct PlanMakerConfig {
    pub max_initial_holder_capacity: usize,
    pub num_groups_limit: usize,
}

impl Default for PlanMakerConfig {
    fn default() -> Self {
        let query = &CONFIG.query;
        Self::new(query.max_init_group_holder_capacity, query.num_groups_limit)
    }
}

impl PlanMakerConfig {
    pub fn new(max_initial_holder_capacity: usize, num_groups_limit: usize) -> Self {
        if max_initial_holder_capacity > num_groups_limit {
            warn!(
                target: "stratodb::plan",
                holder = max_initial_holder_capacity,
                limit = num_groups_limit,
                "Group holder capacity exceeds groups limit, clamping"
            );
        }
        Self {
            max_initial_holder_capacity: max_initial_holder_capacity.min(num_groups_limit),
            num_groups_limit,
        }
    }
}

/// Builds one leaf plan per surviving segment, wraps them in a combine node
/// and that in an instance-response node.
pub struct PlanMaker {
    config: PlanMakerConfig,
}

impl PlanMaker {
    pub fn new(config: PlanMakerConfig) -> Self {
        Self { config }
    }

    pub fn make_instance_plan(
        &self,
        query: Arc<QueryContext>,
        segments: Vec<Arc<Segment>>,
    ) -> Result<InstanceResponsePlan, QueryExecutionError> {
        query.validate()?;
        let agg_functions: Arc<Vec<AggregationFunction>> = Arc::new(
            query
                .aggregation_expressions()
                .iter()
                .map(registry::from_function_context)
                .collect::<Result<_, _>>()?,
        );

        let representative = segments
            .first()
            .ok_or_else(|| QueryExecutionError::Aborted)?;
        let output_schema = self.output_schema(&query, representative, &agg_functions);

        let leaves = segments
            .iter()
            .map(|segment| LeafPlan {
                kind: select_plan_kind(&query, segment),
                segment: Arc::clone(segment),
                query: Arc::clone(&query),
                agg_functions: Arc::clone(&agg_functions),
                holder_capacity: self.config.max_initial_holder_capacity,
            })
            .collect();

        let combine = CombinePlan::new(
            Arc::clone(&query),
            leaves,
            agg_functions,
            output_schema,
            self.config.clone(),
        )?;
        Ok(InstanceResponsePlan::new(combine))
    }

    fn output_schema(
        &self,
        query: &QueryContext,
        segment: &Segment,
        agg_functions: &[AggregationFunction],
    ) -> DataSchema {
        if !query.is_aggregation_query() {
            selection_schema(query, segment)
        } else if query.group_by.is_some() {
            group_by_schema(query, segment, agg_functions)
        } else {
            aggregation_schema(agg_functions)
        }
    }
}
