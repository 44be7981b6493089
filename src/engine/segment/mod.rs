pub mod handle;
pub mod manager;
pub mod metadata;
pub mod pruner;
pub mod source;

pub use handle::{AcquiredSegments, SegmentHandle};
pub use manager::{InstanceDataManager, TableDataManager};
pub use metadata::ColumnMetadata;
pub use source::{ColumnSource, Segment, SegmentBuilder};
