pub mod column_value_pruner;
pub mod empty_pruner;
pub mod kind;
pub mod service;

pub use column_value_pruner::ColumnValuePruner;
pub use empty_pruner::EmptySegmentPruner;
pub use kind::SegmentPruner;
pub use service::PrunerService;

#[cfg(test)]
mod empty_pruner_test;
#[cfg(test)]
mod service_test;
