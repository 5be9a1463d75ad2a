//! Ordered world-state storage for the record ledger.
//!
//! This crate is the storage boundary the ledger core talks to. It provides
//! an ordered string-keyed store, buffered transactions with read-your-writes
//! semantics, range cursors that are always released, and a crash-recoverable
//! commit log that makes committed transactions durable.
//!
//! # Layers
//!
//! - [`WorldState`] -- committed, ordered key-value state
//!   - [`InMemoryWorldState`] -- `BTreeMap` behind a `RwLock`
//!   - [`DurableWorldState`] -- in-memory view replayed from a [`CommitLog`]
//! - [`TransactionContext`] -- the per-operation handle (`get_state`,
//!   `put_state`, `state_by_range`)
//!   - [`Transaction`] -- buffered write set, committed in one `apply`
//! - [`StateIterator`] -- range cursor; [`SnapshotCursor`] is the only
//!   implementation
//!
//! # Design Rules
//!
//! 1. Keys order byte-wise; every range is half-open `[start, end)`.
//! 2. A write set is applied atomically or not at all.
//! 3. Committed write sets are logged before they become visible.
//! 4. Store errors are propagated, never retried here.

pub mod config;
pub mod cursor;
pub mod durable;
pub mod error;
pub mod log;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use config::{StorageConfig, SyncMode};
pub use cursor::{CursorTracker, SnapshotCursor};
pub use durable::DurableWorldState;
pub use error::{StoreError, StoreResult};
pub use log::{CommitLog, LogEntry, Recovery};
pub use memory::InMemoryWorldState;
pub use traits::{KeyValue, StateIterator, TransactionContext, WorldState, WriteSet};
pub use transaction::Transaction;
