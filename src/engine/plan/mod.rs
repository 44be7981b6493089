pub mod block;
pub mod combine;
pub mod context;
pub mod group_by;
pub mod instance;
pub mod leaf;
pub mod maker;
pub mod scan;
pub mod selector;

pub use block::{ExecutionStats, IntermediateBlock};
pub use combine::{CombineOutcome, CombinePlan};
pub use context::ExecutionContext;
pub use instance::InstanceResponsePlan;
pub use leaf::LeafPlan;
pub use maker::{PlanMaker, PlanMakerConfig};
pub use selector::{PlanKind, select_plan_kind};
