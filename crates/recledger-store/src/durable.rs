use std::sync::Mutex;

use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use crate::log::{CommitLog, LogEntry};
use crate::memory::InMemoryWorldState;
use crate::traits::{KeyValue, WorldState, WriteSet};

/// World state backed by a [`CommitLog`].
///
/// Reads are served from an in-memory view. Every applied write set is
/// appended to the log before it becomes visible, so reopening the same
/// data directory reproduces every committed transaction.
pub struct DurableWorldState {
    view: InMemoryWorldState,
    log: CommitLog,
    /// Sequence number of the last committed entry. Held while appending so
    /// log order matches apply order.
    last_seq: Mutex<u64>,
}

impl DurableWorldState {
    /// Open the log named by `config`, replaying it into memory.
    ///
    /// A torn tail left by a crash mid-append is cut off before the log
    /// accepts new commits.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        let log = CommitLog::open(&config.log_path(), config.sync_mode)?;
        let view = InMemoryWorldState::new();

        let recovery = log.recover()?;
        let log_len = log.offset()?;
        if recovery.valid_len < log_len {
            warn!(
                path = %log.path().display(),
                valid_len = recovery.valid_len,
                dropped = log_len - recovery.valid_len,
                "truncating torn commit log tail"
            );
            log.truncate(recovery.valid_len)?;
        }

        let entries = recovery.entries;
        let mut last_seq = 0;
        for entry in &entries {
            view.apply(&entry.writes)?;
            last_seq = last_seq.max(entry.seq);
        }

        info!(
            path = %log.path().display(),
            entries = entries.len(),
            keys = view.len()?,
            "world state opened"
        );
        Ok(Self {
            view,
            log,
            last_seq: Mutex::new(last_seq),
        })
    }

    /// Sequence number of the most recent commit (0 if none).
    pub fn last_seq(&self) -> StoreResult<u64> {
        Ok(*self.lock_seq()?)
    }

    /// Number of live keys.
    pub fn len(&self) -> StoreResult<usize> {
        self.view.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.view.is_empty()
    }

    /// Collapse the log into a single entry holding the current state.
    pub fn compact(&self) -> StoreResult<()> {
        let seq = self.lock_seq()?;
        let snapshot = self.view.snapshot()?;
        let entries = if snapshot.is_empty() {
            Vec::new()
        } else {
            vec![LogEntry {
                seq: *seq,
                writes: snapshot,
            }]
        };
        self.log.rewrite(&entries)?;
        info!(seq = *seq, "commit log compacted");
        Ok(())
    }

    fn lock_seq(&self) -> StoreResult<std::sync::MutexGuard<'_, u64>> {
        self.last_seq
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl WorldState for DurableWorldState {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.view.get(key)
    }

    fn scan(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>> {
        self.view.scan(start, end)
    }

    fn apply(&self, writes: &WriteSet) -> StoreResult<()> {
        let mut seq = self.lock_seq()?;
        let entry = LogEntry {
            seq: *seq + 1,
            writes: writes.clone(),
        };
        self.log.append(&entry)?;
        self.view.apply(writes)?;
        *seq = entry.seq;
        Ok(())
    }
}

impl std::fmt::Debug for DurableWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableWorldState")
            .field("log", &self.log)
            .field("view", &self.view)
            .finish()
    }
}
