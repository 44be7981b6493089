use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashSet;
use std::sync::Arc;

use crate::engine::table::order::{IntermediateRecord, ResolvedOrderBy};
use crate::engine::types::{Key, Record};

/// Trims a keyed record set down to `trim_to` survivors under the order-by
/// comparator, using whichever bounded heap is smaller: a heap of the
/// records to evict, or a heap of the records to retain.
#[derive(Debug, Clone)]
pub struct TableResizer {
    order_by: Arc<[ResolvedOrderBy]>,
}

struct Ranked {
    rank: IntermediateRecord,
    index: usize,
    order_by: Arc<[ResolvedOrderBy]>,
}

impl Ranked {
    fn best_first(&self, other: &Self) -> Ordering {
        self.rank.compare(&other.rank, &self.order_by)
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.best_first(other).is_eq()
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.best_first(other)
    }
}

impl TableResizer {
    pub fn new(order_by: Vec<ResolvedOrderBy>) -> Self {
        Self {
            order_by: order_by.into(),
        }
    }

    fn ranked(&self, key: &Key, record: &Record, index: usize) -> Ranked {
        Ranked {
            rank: IntermediateRecord::project(key, record, &self.order_by),
            index,
            order_by: Arc::clone(&self.order_by),
        }
    }

    /// Keys to remove so that `trim_to` survivors remain. Empty when the
    /// set already fits.
    pub fn keys_to_evict(&self, entries: &[(Key, Record)], trim_to: usize) -> Vec<Key> {
        let n = entries.len();
        if n <= trim_to {
            return Vec::new();
        }
        let evict_count = n - trim_to;
        if evict_count < trim_to {
            // Fewer to evict than to retain: bounded heap of the worst.
            // The heap pops its best record, so after capping at
            // evict_count only the worst remain.
            let mut heap: BinaryHeap<std::cmp::Reverse<Ranked>> =
                BinaryHeap::with_capacity(evict_count + 1);
            for (i, (key, record)) in entries.iter().enumerate() {
                heap.push(std::cmp::Reverse(self.ranked(key, record, i)));
                if heap.len() > evict_count {
                    heap.pop();
                }
            }
            heap.into_iter()
                .map(|item| entries[item.0.index].0.clone())
                .collect()
        } else {
            // Fewer to retain than to evict: bounded heap of the best, then
            // evict the complement.
            let retained = self.retain_heap(entries, trim_to);
            let keep: HashSet<usize> = retained.into_iter().map(|r| r.index).collect();
            entries
                .iter()
                .enumerate()
                .filter(|(i, _)| !keep.contains(i))
                .map(|(_, (key, _))| key.clone())
                .collect()
        }
    }

    /// Bounded heap holding the `trim_to` best records; pops worst-first.
    fn retain_heap(&self, entries: &[(Key, Record)], trim_to: usize) -> BinaryHeap<Ranked> {
        // Max-heap under best-first ordering keeps its worst on top.
        let mut heap: BinaryHeap<Ranked> = BinaryHeap::with_capacity(trim_to + 1);
        for (i, (key, record)) in entries.iter().enumerate() {
            heap.push(self.ranked(key, record, i));
            if heap.len() > trim_to {
                heap.pop();
            }
        }
        heap
    }

    /// Trim and sort in one pass: build the retain-heap, then drain it into
    /// a reverse-indexed array, which lands sorted without a second pass.
    pub fn resize_and_sort(
        &self,
        mut entries: Vec<(Key, Record)>,
        trim_to: usize,
    ) -> Vec<(Key, Record)> {
        let keep = entries.len().min(trim_to);
        let mut heap = self.retain_heap(&entries, trim_to);
        let mut indexes: Vec<usize> = vec![0; keep];
        let mut slot = keep;
        while let Some(item) = heap.pop() {
            slot -= 1;
            indexes[slot] = item.index;
        }
        // Move the survivors out in rank order.
        let mut out: Vec<Option<(Key, Record)>> = entries.drain(..).map(Some).collect();
        indexes
            .into_iter()
            .map(|i| out[i].take().expect("survivor index duplicated"))
            .collect()
    }
}
