use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A single key/value pair yielded by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Ordered set of pending writes, applied to a [`WorldState`] as one unit.
///
/// Later writes to the same key replace earlier ones, so a write set always
/// holds at most one value per key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSet {
    puts: BTreeMap<String, Vec<u8>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.puts.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.puts.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Iterate all pending writes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.puts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate pending writes within the half-open interval `[start, end)`.
    ///
    /// Callers must have checked the bounds with [`check_range`].
    pub fn range<'a>(
        &'a self,
        start: &'a str,
        end: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [u8])> + 'a {
        self.puts
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn clear(&mut self) {
        self.puts.clear();
    }
}

/// Reject ranges whose start sorts after their end.
pub fn check_range(start: &str, end: &str) -> StoreResult<()> {
    if start > end {
        return Err(StoreError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

/// Committed, ordered key-value state.
///
/// Implementations must satisfy these invariants:
/// - Keys are ordered by byte-wise string comparison; `scan` returns entries
///   in that order.
/// - `apply` is atomic: readers observe either none or all of a write set.
/// - Values are opaque; the store never interprets them.
pub trait WorldState: Send + Sync {
    /// Read the committed value at `key`. `Ok(None)` means absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Collect all committed entries in `[start, end)`.
    fn scan(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>>;

    /// Atomically apply a write set.
    fn apply(&self, writes: &WriteSet) -> StoreResult<()>;
}

/// Ordered cursor over a range of the world state.
///
/// Closing is idempotent; a closed cursor yields nothing. Dropping a cursor
/// closes it.
pub trait StateIterator: Iterator<Item = StoreResult<KeyValue>> {
    /// Whether another entry is available.
    fn has_next(&self) -> bool;

    /// Release the cursor.
    fn close(&mut self);
}

/// The handle a ledger operation uses to reach the world state for the
/// duration of one transaction.
pub trait TransactionContext {
    /// Read `key`, observing this transaction's own pending writes first.
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stage a write of `value` at `key`.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Open a cursor over `[start, end)` in key order.
    fn state_by_range<'a>(
        &'a self,
        start: &str,
        end: &str,
    ) -> StoreResult<Box<dyn StateIterator + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_set_keeps_last_write() {
        let mut ws = WriteSet::new();
        ws.put("a", b"1".to_vec());
        ws.put("a", b"2".to_vec());
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.get("a"), Some(&b"2"[..]));
    }

    #[test]
    fn write_set_range_is_half_open() {
        let mut ws = WriteSet::new();
        for key in ["k0", "k1", "k2", "k3"] {
            ws.put(key, key.as_bytes().to_vec());
        }
        let keys: Vec<&str> = ws.range("k1", "k3").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn check_range_rejects_inverted_bounds() {
        assert!(check_range("a", "b").is_ok());
        assert!(check_range("a", "a").is_ok());
        assert!(matches!(
            check_range("b", "a"),
            Err(StoreError::InvalidRange { .. })
        ));
    }
}
