use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyValue, WorldState, WriteSet, check_range};

/// In-memory, `BTreeMap`-based world state.
///
/// Intended for tests and embedding, and as the materialized view behind
/// [`DurableWorldState`](crate::DurableWorldState). Values are cloned on
/// read; a write set is applied under a single write lock.
pub struct InMemoryWorldState {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryWorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    /// Copy the whole state into a single write set.
    pub fn snapshot(&self) -> StoreResult<WriteSet> {
        let map = self.read_lock()?;
        let mut ws = WriteSet::new();
        for (k, v) in map.iter() {
            ws.put(k.clone(), v.clone());
        }
        Ok(ws)
    }

    fn read_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryWorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState for InMemoryWorldState {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_lock()?.get(key).cloned())
    }

    fn scan(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>> {
        check_range(start, end)?;
        let map = self.read_lock()?;
        Ok(map
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, writes: &WriteSet) -> StoreResult<()> {
        let mut map = self
            .entries
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        for (k, v) in writes.iter() {
            map.insert(k.to_string(), v.to_vec());
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryWorldState")
            .field("key_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_set(pairs: &[(&str, &str)]) -> WriteSet {
        let mut ws = WriteSet::new();
        for (k, v) in pairs {
            ws.put(*k, v.as_bytes().to_vec());
        }
        ws
    }

    #[test]
    fn get_missing_returns_none() {
        let state = InMemoryWorldState::new();
        assert!(state.get("absent").unwrap().is_none());
    }

    #[test]
    fn apply_then_get() {
        let state = InMemoryWorldState::new();
        state.apply(&write_set(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(state.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(state.len().unwrap(), 2);
    }

    #[test]
    fn empty_value_is_present() {
        let state = InMemoryWorldState::new();
        state.apply(&write_set(&[("a", "")])).unwrap();
        assert_eq!(state.get("a").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn scan_is_ordered_and_half_open() {
        let state = InMemoryWorldState::new();
        state
            .apply(&write_set(&[("k2", "c"), ("k0", "a"), ("k1", "b"), ("k3", "d")]))
            .unwrap();

        let keys: Vec<String> = state
            .scan("k0", "k3")
            .unwrap()
            .into_iter()
            .map(|kv| kv.key)
            .collect();
        assert_eq!(keys, vec!["k0", "k1", "k2"]);
    }

    #[test]
    fn scan_orders_bytewise() {
        let state = InMemoryWorldState::new();
        state
            .apply(&write_set(&[("REC2", "x"), ("REC10", "y")]))
            .unwrap();
        let keys: Vec<String> = state
            .scan("REC0", "REC99")
            .unwrap()
            .into_iter()
            .map(|kv| kv.key)
            .collect();
        assert_eq!(keys, vec!["REC10", "REC2"]);
    }

    #[test]
    fn scan_rejects_inverted_range() {
        let state = InMemoryWorldState::new();
        assert!(matches!(
            state.scan("z", "a"),
            Err(StoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn snapshot_copies_everything() {
        let state = InMemoryWorldState::new();
        state.apply(&write_set(&[("a", "1"), ("b", "2")])).unwrap();
        let snap = state.snapshot().unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("b"), Some(&b"2"[..]));
    }

    #[test]
    fn debug_format() {
        let state = InMemoryWorldState::new();
        let debug = format!("{state:?}");
        assert!(debug.contains("InMemoryWorldState"));
        assert!(debug.contains("key_count"));
    }
}
