pub mod format;
pub mod reducer;
pub mod response;

pub use format::format_value;
pub use reducer::{BrokerReducer, BrokerRequest};
pub use response::{AggregationResult, BrokerResponse, GroupByEntry, ResultTable};

#[cfg(test)]
mod reducer_test;
