//! Range cursors and open-cursor accounting.
//!
//! A [`SnapshotCursor`] holds the entries of one range scan, materialized at
//! open time, plus a guard registered with a [`CursorTracker`]. The guard is
//! released on `close()` or drop, whichever comes first, so the tracker's
//! count is exact on every exit path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::StoreResult;
use crate::traits::{KeyValue, StateIterator};

/// Counts cursors that are currently open.
#[derive(Clone, Debug, Default)]
pub struct CursorTracker {
    open: Arc<AtomicUsize>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cursors opened through this tracker and not yet released.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    fn acquire(&self) -> CursorGuard {
        self.open.fetch_add(1, Ordering::AcqRel);
        CursorGuard {
            open: Arc::clone(&self.open),
        }
    }
}

#[derive(Debug)]
struct CursorGuard {
    open: Arc<AtomicUsize>,
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Cursor over a materialized range scan.
#[derive(Debug)]
pub struct SnapshotCursor {
    entries: VecDeque<KeyValue>,
    guard: Option<CursorGuard>,
}

impl SnapshotCursor {
    pub fn new(entries: Vec<KeyValue>, tracker: &CursorTracker) -> Self {
        Self {
            entries: entries.into(),
            guard: Some(tracker.acquire()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.guard.is_none()
    }
}

impl Iterator for SnapshotCursor {
    type Item = StoreResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_closed() {
            return None;
        }
        self.entries.pop_front().map(Ok)
    }
}

impl StateIterator for SnapshotCursor {
    fn has_next(&self) -> bool {
        !self.is_closed() && !self.entries.is_empty()
    }

    fn close(&mut self) {
        self.entries.clear();
        self.guard = None;
    }
}
