pub mod indexed;
pub mod order;
pub mod resizer;

pub use indexed::ConcurrentIndexedTable;
pub use order::{IntermediateRecord, ResolvedOrderBy, resolve_order_by};
pub use resizer::TableResizer;
