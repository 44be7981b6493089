use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const TIMEOUT_MS: &str = "timeoutMs";
pub const GROUP_BY_MODE: &str = "groupByMode";
pub const RESPONSE_FORMAT: &str = "responseFormat";
pub const PRESERVE_TYPE: &str = "preserveType";

const SQL: &str = "sql";

/// Query options mapping. Keys are fixed strings; values compare
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions(HashMap<String, String>);

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Per-query deadline override in milliseconds, when present and valid.
    pub fn timeout_ms(&self) -> Option<u64> {
        self.get(TIMEOUT_MS).and_then(|v| v.trim().parse().ok())
    }

    pub fn group_by_mode_sql(&self) -> bool {
        self.get(GROUP_BY_MODE)
            .is_some_and(|v| v.eq_ignore_ascii_case(SQL))
    }

    pub fn response_format_sql(&self) -> bool {
        self.get(RESPONSE_FORMAT)
            .is_some_and(|v| v.eq_ignore_ascii_case(SQL))
    }

    /// Defaults to true; only an explicit "false" turns formatting on.
    pub fn preserve_type(&self) -> bool {
        !self
            .get(PRESERVE_TYPE)
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    }
}
