use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::engine::segment::source::Segment;

/// A reference-counted lease on one resident segment, held for the duration
/// of a single query. Releasing twice is a no-op; dropping an unreleased
/// handle releases it, so every exit path balances.
#[derive(Debug)]
pub struct SegmentHandle {
    segment: Arc<Segment>,
    refs: Arc<AtomicI64>,
    released: bool,
}

impl SegmentHandle {
    pub(crate) fn new(segment: Arc<Segment>, refs: Arc<AtomicI64>) -> Self {
        refs.fetch_add(1, Ordering::AcqRel);
        Self {
            segment,
            refs,
            released: false,
        }
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    pub fn release(&mut self) {
        if !self.released {
            self.refs.fetch_sub(1, Ordering::AcqRel);
            self.released = true;
        }
    }
}

impl Drop for SegmentHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// The outcome of a best-effort acquire: handles for the segments that were
/// resident, plus the count of requested ids that were not.
#[derive(Debug)]
pub struct AcquiredSegments {
    pub handles: Vec<SegmentHandle>,
    pub num_missing: usize,
}

impl AcquiredSegments {
    pub fn segments(&self) -> Vec<Arc<Segment>> {
        self.handles.iter().map(|h| Arc::clone(h.segment())).collect()
    }

    pub fn num_acquired(&self) -> usize {
        self.handles.len()
    }

    pub fn release_all(&mut self) {
        for handle in &mut self.handles {
            handle.release();
        }
    }
}
