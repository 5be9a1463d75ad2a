use std::ops::Range;

use recledger_store::{StateIterator, TransactionContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codec;
use crate::error::{LedgerError, LedgerResult};
use crate::key::KeyScheme;
use crate::record::{QueryResult, Record};
use crate::schema::RecordSchema;

/// Schema and key scheme shared by every ledger operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerLayout {
    pub schema: RecordSchema,
    pub keys: KeyScheme,
}

impl LedgerLayout {
    pub fn new(schema: RecordSchema, keys: KeyScheme) -> Self {
        Self { schema, keys }
    }
}

/// What `seed` does when the namespace already holds records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedPolicy {
    /// Write nothing if any record exists.
    #[default]
    SkipIfPopulated,
    /// Write every seed record, replacing whatever is at its key.
    Overwrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub seeded: usize,
    pub skipped: bool,
}

/// The record ledger, bound to one transaction.
///
/// A `RecordLedger` holds no state of its own: every operation goes straight
/// to the transaction context, and the ledger is dropped when the
/// transaction ends.
pub struct RecordLedger<'a, T: TransactionContext + ?Sized> {
    layout: &'a LedgerLayout,
    tx: &'a mut T,
}

impl<'a, T: TransactionContext + ?Sized> RecordLedger<'a, T> {
    pub fn new(layout: &'a LedgerLayout, tx: &'a mut T) -> Self {
        Self { layout, tx }
    }

    pub fn layout(&self) -> &LedgerLayout {
        self.layout
    }

    /// Write `record` at `index`, replacing any existing record.
    ///
    /// Returns the key written.
    pub fn create(&mut self, index: u64, record: &Record) -> LedgerResult<String> {
        let key = self.layout.keys.key(index)?;
        let bytes = codec::encode(&self.layout.schema, record)?;
        self.tx.put_state(&key, bytes)?;
        debug!(%key, "record written");
        Ok(key)
    }

    /// Read the record at `index`.
    pub fn read(&self, index: u64) -> LedgerResult<Record> {
        let key = self.layout.keys.key(index)?;
        self.read_key(&key)
    }

    fn read_key(&self, key: &str) -> LedgerResult<Record> {
        match self.tx.get_state(key)? {
            Some(bytes) => codec::decode(&self.layout.schema, key, &bytes),
            None => Err(LedgerError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Iterate records with keys in `[start_key, end_key)`, in key order.
    pub fn list_by_range(&self, start_key: &str, end_key: &str) -> LedgerResult<RecordRange<'_>> {
        let cursor = self.tx.state_by_range(start_key, end_key)?;
        Ok(RecordRange::new(cursor, &self.layout.schema))
    }

    /// Iterate every record in the key namespace.
    pub fn list_all(&self) -> LedgerResult<RecordRange<'_>> {
        let (start, end) = self.layout.keys.namespace_range();
        self.list_by_range(&start, &end)
    }

    /// Iterate records whose index falls in `range`.
    pub fn list_indices(&self, range: Range<u64>) -> LedgerResult<RecordRange<'_>> {
        let (start, end) = self.layout.keys.index_range(range)?;
        self.list_by_range(&start, &end)
    }

    /// Whether any key exists in the namespace.
    pub fn is_populated(&self) -> LedgerResult<bool> {
        let (start, end) = self.layout.keys.namespace_range();
        let mut cursor = self.tx.state_by_range(&start, &end)?;
        let populated = cursor.has_next();
        cursor.close();
        Ok(populated)
    }

    /// Set one mutable field of an existing record. Returns the updated
    /// record.
    ///
    /// Never creates a record: a missing key fails with `NotFound` before
    /// anything is written.
    pub fn update(&mut self, index: u64, field: &str, value: &str) -> LedgerResult<Record> {
        self.layout.schema.check_mutable(field)?;
        let key = self.layout.keys.key(index)?;
        let mut record = self.read_key(&key)?;
        record.set(field, value);

        let bytes = codec::encode(&self.layout.schema, &record)?;
        self.tx.put_state(&key, bytes)?;
        debug!(%key, field, "record field updated");
        Ok(record)
    }

    /// Write `records` at indices `0..records.len()`, in order.
    ///
    /// Every record is checked against the schema before the first write.
    /// Writes stop at the first failure; the enclosing transaction decides
    /// whether the partial batch is kept.
    pub fn seed(&mut self, records: &[Record], policy: SeedPolicy) -> LedgerResult<SeedReport> {
        let count = records.len() as u64;
        if count > self.layout.keys.capacity() {
            return Err(LedgerError::KeyOutOfRange {
                index: count - 1,
                capacity: self.layout.keys.capacity(),
            });
        }
        for record in records {
            self.layout.schema.validate(record)?;
        }

        if policy == SeedPolicy::SkipIfPopulated && self.is_populated()? {
            info!("namespace already populated; seed skipped");
            return Ok(SeedReport {
                seeded: 0,
                skipped: true,
            });
        }

        for (index, record) in records.iter().enumerate() {
            self.create(index as u64, record)?;
        }
        info!(seeded = records.len(), ?policy, "ledger seeded");
        Ok(SeedReport {
            seeded: records.len(),
            skipped: false,
        })
    }
}

/// Lazy `(key, record)` sequence over one range scan.
///
/// Yields at most one error, after which the sequence ends. The underlying
/// cursor is closed as soon as the sequence ends and, at the latest, when the
/// `RecordRange` is dropped.
pub struct RecordRange<'a> {
    cursor: Box<dyn StateIterator + 'a>,
    schema: &'a RecordSchema,
    done: bool,
}

impl<'a> RecordRange<'a> {
    fn new(cursor: Box<dyn StateIterator + 'a>, schema: &'a RecordSchema) -> Self {
        Self {
            cursor,
            schema,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.cursor.close();
    }
}

impl Iterator for RecordRange<'_> {
    type Item = LedgerResult<QueryResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let entry = match self.cursor.next() {
            Some(Ok(entry)) => entry,
            Some(Err(e)) => {
                self.finish();
                return Some(Err(e.into()));
            }
            None => {
                self.finish();
                return None;
            }
        };

        match codec::decode(self.schema, &entry.key, &entry.value) {
            Ok(record) => Some(Ok(QueryResult {
                key: entry.key,
                record,
            })),
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl Drop for RecordRange<'_> {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
