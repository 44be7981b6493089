pub mod query_factory;
pub mod segment_factory;

pub use query_factory::QueryFactory;
pub use segment_factory::SegmentFactory;
