//! Buffered transactions over a [`WorldState`].
//!
//! A [`Transaction`] stages writes in a private [`WriteSet`]. Reads and range
//! scans observe the transaction's own writes layered over committed state.
//! Nothing reaches the world state until [`Transaction::commit`], which hands
//! the whole write set to [`WorldState::apply`] in one call.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cursor::{CursorTracker, SnapshotCursor};
use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyValue, StateIterator, TransactionContext, WorldState, WriteSet, check_range};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Active,
    Committed,
    Aborted,
}

/// One unit of atomic work against a world state.
pub struct Transaction<'s, S: WorldState + ?Sized> {
    state: &'s S,
    writes: WriteSet,
    status: Status,
    cursors: CursorTracker,
}

impl<'s, S: WorldState + ?Sized> Transaction<'s, S> {
    /// Begin a transaction against `state`.
    pub fn begin(state: &'s S) -> Self {
        Self {
            state,
            writes: WriteSet::new(),
            status: Status::Active,
            cursors: CursorTracker::new(),
        }
    }

    /// Writes staged so far.
    pub fn pending(&self) -> &WriteSet {
        &self.writes
    }

    /// Number of range cursors opened by this transaction and not yet released.
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Apply every staged write to the world state. Returns the number of
    /// keys written.
    ///
    /// An empty write set commits without touching the world state.
    pub fn commit(&mut self) -> StoreResult<usize> {
        self.ensure_active()?;
        let written = self.writes.len();
        if !self.writes.is_empty() {
            self.state.apply(&self.writes)?;
        }
        self.writes.clear();
        self.status = Status::Committed;
        debug!(written, "transaction committed");
        Ok(written)
    }

    /// Discard staged writes. Every later call on this transaction fails
    /// with [`StoreError::Aborted`].
    pub fn abort(&mut self) {
        if self.status == Status::Active {
            debug!(discarded = self.writes.len(), "transaction aborted");
        }
        self.writes.clear();
        self.status = Status::Aborted;
    }

    fn ensure_active(&self) -> StoreResult<()> {
        match self.status {
            Status::Active => Ok(()),
            Status::Committed => Err(StoreError::Closed),
            Status::Aborted => Err(StoreError::Aborted),
        }
    }
}

impl<S: WorldState + ?Sized> TransactionContext for Transaction<'_, S> {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.to_vec()));
        }
        self.state.get(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes.put(key, value);
        Ok(())
    }

    fn state_by_range<'a>(
        &'a self,
        start: &str,
        end: &str,
    ) -> StoreResult<Box<dyn StateIterator + 'a>> {
        self.ensure_active()?;
        check_range(start, end)?;

        let mut merged: BTreeMap<String, Vec<u8>> = self
            .state
            .scan(start, end)?
            .into_iter()
            .map(|kv| (kv.key, kv.value))
            .collect();
        for (k, v) in self.writes.range(start, end) {
            merged.insert(k.to_string(), v.to_vec());
        }

        let entries = merged
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect();
        Ok(Box::new(SnapshotCursor::new(entries, &self.cursors)))
    }
}

impl<S: WorldState + ?Sized> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if self.status == Status::Active && !self.writes.is_empty() {
            debug!(
                discarded = self.writes.len(),
                "dropping uncommitted transaction"
            );
        }
    }
}

impl<S: WorldState + ?Sized> std::fmt::Debug for Transaction<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("status", &self.status)
            .field("pending", &self.writes.len())
            .field("open_cursors", &self.open_cursors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryWorldState;

    fn seeded_state() -> InMemoryWorldState {
        let state = InMemoryWorldState::new();
        let mut ws = WriteSet::new();
        ws.put("k1", b"one".to_vec());
        ws.put("k3", b"three".to_vec());
        state.apply(&ws).unwrap();
        state
    }

    // -----------------------------------------------------------------------
    // Read-your-writes
    // -----------------------------------------------------------------------

    #[test]
    fn reads_see_pending_writes() {
        let state = seeded_state();
        let mut tx = Transaction::begin(&state);
        tx.put_state("k1", b"uno".to_vec()).unwrap();

        assert_eq!(tx.get_state("k1").unwrap(), Some(b"uno".to_vec()));
        assert_eq!(state.get("k1").unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn range_merges_pending_writes() {
        let state = seeded_state();
        let mut tx = Transaction::begin(&state);
        tx.put_state("k2", b"two".to_vec()).unwrap();
        tx.put_state("k3", b"tres".to_vec()).unwrap();
        tx.put_state("k9", b"outside".to_vec()).unwrap();

        let entries: Vec<KeyValue> = tx
            .state_by_range("k0", "k5")
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        let pairs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|kv| (kv.key.as_str(), kv.value.as_slice()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("k1", &b"one"[..]),
                ("k2", &b"two"[..]),
                ("k3", &b"tres"[..]),
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Commit / abort
    // -----------------------------------------------------------------------

    #[test]
    fn commit_applies_write_set() {
        let state = InMemoryWorldState::new();
        let mut tx = Transaction::begin(&state);
        tx.put_state("a", b"1".to_vec()).unwrap();
        tx.put_state("b", b"2".to_vec()).unwrap();
        assert_eq!(tx.commit().unwrap(), 2);

        assert_eq!(state.len().unwrap(), 2);
        assert!(matches!(tx.get_state("a"), Err(StoreError::Closed)));
    }

    #[test]
    fn abort_discards_and_poisons() {
        let state = InMemoryWorldState::new();
        let mut tx = Transaction::begin(&state);
        tx.put_state("a", b"1".to_vec()).unwrap();
        tx.abort();

        assert!(state.is_empty().unwrap());
        assert!(matches!(tx.get_state("a"), Err(StoreError::Aborted)));
        assert!(matches!(
            tx.put_state("a", vec![]),
            Err(StoreError::Aborted)
        ));
        assert!(matches!(tx.state_by_range("a", "z"), Err(StoreError::Aborted)));
        assert!(matches!(tx.commit(), Err(StoreError::Aborted)));
    }

    #[test]
    fn dropped_transaction_writes_nothing() {
        let state = InMemoryWorldState::new();
        {
            let mut tx = Transaction::begin(&state);
            tx.put_state("a", b"1".to_vec()).unwrap();
        }
        assert!(state.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // Cursor accounting
    // -----------------------------------------------------------------------

    #[test]
    fn cursors_are_counted_until_released() {
        let state = seeded_state();
        let tx = Transaction::begin(&state);
        let mut cursor = tx.state_by_range("k0", "k9").unwrap();
        assert_eq!(tx.open_cursors(), 1);
        assert!(cursor.has_next());
        cursor.close();
        assert_eq!(tx.open_cursors(), 0);

        let cursor = tx.state_by_range("k0", "k9").unwrap();
        drop(cursor);
        assert_eq!(tx.open_cursors(), 0);
    }
}
