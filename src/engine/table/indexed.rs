use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::engine::agg::AggregationFunction;
use crate::engine::table::order::ResolvedOrderBy;
use crate::engine::table::resizer::TableResizer;
use crate::engine::types::{DataSchema, Key, Record};

/// Bounded concurrent keyed merge buffer for group-by results.
///
/// `upsert` merges columnwise under the map's per-key critical section, so
/// concurrent inserts for the same key fold associatively. Once the table
/// grows past `capacity` it is trimmed back to `trim_to` survivors under
/// the order-by ranking; `finish` freezes it and fixes the output order.
pub struct ConcurrentIndexedTable {
    schema: DataSchema,
    agg_functions: Arc<Vec<AggregationFunction>>,
    resizer: Option<TableResizer>,
    trim_to: usize,
    capacity: usize,
    num_groups_limit: usize,
    map: DashMap<Key, Record, ahash::RandomState>,
    size: AtomicUsize,
    trim_lock: Mutex<()>,
    num_groups_dropped: AtomicU64,
    finished: AtomicBool,
    rows: RwLock<Option<Vec<Record>>>,
}

/// Both bounds derive from the same formula, rounded up to a power of two;
/// the trim trigger sits one doubling above the post-trim size.
pub fn trim_to_size(limit: usize, max_initial_holder_capacity: usize) -> usize {
    (limit.saturating_mul(5))
        .max(max_initial_holder_capacity)
        .max(1)
        .next_power_of_two()
}

impl ConcurrentIndexedTable {
    pub fn new(
        schema: DataSchema,
        agg_functions: Arc<Vec<AggregationFunction>>,
        order_by: Option<Vec<ResolvedOrderBy>>,
        limit: usize,
        max_initial_holder_capacity: usize,
        num_groups_limit: usize,
    ) -> Self {
        let trim_to = trim_to_size(limit, max_initial_holder_capacity);
        Self {
            schema,
            agg_functions,
            resizer: order_by.map(TableResizer::new),
            trim_to,
            capacity: trim_to * 2,
            num_groups_limit,
            map: DashMap::with_hasher(ahash::RandomState::new()),
            size: AtomicUsize::new(0),
            trim_lock: Mutex::new(()),
            num_groups_dropped: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            rows: RwLock::new(None),
        }
    }

    pub fn schema(&self) -> &DataSchema {
        &self.schema
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn trim_to(&self) -> usize {
        self.trim_to
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_groups_dropped(&self) -> u64 {
        self.num_groups_dropped.load(Ordering::Relaxed)
    }

    /// Inserts a new group or merges into an existing one. New groups past
    /// the groups limit are dropped and counted, existing groups always
    /// merge. Upserts arriving after `finish` are ignored; abandoned
    /// stragglers may still be draining when the table freezes.
    pub fn upsert(&self, key: Key, record: Record) {
        if self.finished.load(Ordering::Acquire) {
            return;
        }
        debug_assert_eq!(record.len(), self.schema.num_columns());
        let num_keys = self.schema.num_key_columns;
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                for (i, function) in self.agg_functions.iter().enumerate() {
                    let col = num_keys + i;
                    existing[col] = function.merge(&existing[col], &record[col]);
                }
            }
            Entry::Vacant(vacant) => {
                let current = self.size.load(Ordering::Acquire);
                let cap = if self.resizer.is_some() {
                    self.num_groups_limit
                } else {
                    // Without an order-by there is nothing to rank a trim
                    // by; the table simply stops accepting new groups.
                    self.num_groups_limit.min(self.trim_to)
                };
                if current >= cap {
                    self.num_groups_dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                vacant.insert(record);
                self.size.fetch_add(1, Ordering::AcqRel);
            }
        }
        if self.resizer.is_some() && self.size() > self.capacity {
            self.trim();
        }
    }

    /// Stop-the-world trim back to `trim_to` survivors.
    fn trim(&self) {
        let Some(resizer) = &self.resizer else {
            return;
        };
        let _guard = self.trim_lock.lock();
        if self.size() <= self.capacity {
            return;
        }
        let entries: Vec<(Key, Record)> = self
            .map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let evict = resizer.keys_to_evict(&entries, self.trim_to);
        debug!(
            target: "stratodb::table",
            size = entries.len(),
            evicted = evict.len(),
            "Trimming indexed table"
        );
        for key in evict {
            if self.map.remove(&key).is_some() {
                self.size.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    /// Closes the table for writes. With `sort` the output is the order-by
    /// order; otherwise a stable but unspecified order. Requires all
    /// upserts to have quiesced.
    pub fn finish(&self, sort: bool) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut entries: Vec<(Key, Record)> = self
            .map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        self.map.clear();
        self.size.store(0, Ordering::Release);
        let records: Vec<Record> = match (&self.resizer, sort) {
            (Some(resizer), true) => resizer
                .resize_and_sort(entries, self.trim_to)
                .into_iter()
                .map(|(_, record)| record)
                .collect(),
            _ => {
                // Stable iteration order without an order-by: key hash.
                entries.sort_by_key(|(key, _)| key.hash_code());
                entries.truncate(self.trim_to);
                entries.into_iter().map(|(_, record)| record).collect()
            }
        };
        *self.rows.write() = Some(records);
    }

    /// Single-pass consumption of the finished table.
    pub fn take_rows(&self) -> Vec<Record> {
        debug_assert!(self.finished.load(Ordering::Acquire));
        self.rows.write().take().unwrap_or_default()
    }
}
