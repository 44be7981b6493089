pub mod cell;
pub mod record;
pub mod schema;

pub use cell::{CellValue, ColumnType, ObjectValue};
pub use record::{Key, Record};
pub use schema::DataSchema;

#[cfg(test)]
mod schema_test;
