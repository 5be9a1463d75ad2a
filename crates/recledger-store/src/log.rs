use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::traits::WriteSet;

/// One committed transaction as recorded in the commit log.
///
/// On-disk frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogEntry)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Commit sequence number, starting at 1.
    pub seq: u64,
    /// Every key written by the transaction.
    pub writes: WriteSet,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// What [`CommitLog::recover`] found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Intact entries in append order.
    pub entries: Vec<LogEntry>,
    /// Length of the prefix made of whole frames. Bytes past it belong to a
    /// torn write.
    pub valid_len: u64,
    /// Whole frames dropped for a bad checksum or payload.
    pub skipped: usize,
}

struct LogWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Append-only, crash-recoverable log of committed write sets.
///
/// Recovery reads the file front to back. Frames that fail the CRC check
/// are skipped; a frame whose length runs past the end of the file is a torn
/// write and ends recovery.
pub struct CommitLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_mode: SyncMode,
}

impl CommitLog {
    /// Open (or create) the log file at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let (writer, offset) = open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter { writer, offset }),
            sync_mode,
        })
    }

    /// Append one entry. Returns the byte offset the frame starts at.
    pub fn append(&self, entry: &LogEntry) -> StoreResult<u64> {
        let frame = encode_frame(entry)?;
        let mut w = self.lock()?;
        let entry_offset = w.offset;

        w.writer.write_all(&frame)?;
        w.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }
        w.offset += frame.len() as u64;

        debug!(
            offset = entry_offset,
            seq = entry.seq,
            keys = entry.writes.len(),
            "commit log append"
        );
        Ok(entry_offset)
    }

    /// Scan the log front to back.
    ///
    /// Frames with a bad checksum or an undecodable payload are skipped but
    /// still count toward `valid_len`; a partial frame at the end does not.
    pub fn recover(&self) -> StoreResult<Recovery> {
        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;

        let mut recovery = Recovery::default();
        let mut rest = bytes.as_slice();
        while let Some((payload, crc, frame_len)) = split_frame(rest) {
            let frame_offset = recovery.valid_len;
            rest = &rest[frame_len..];
            recovery.valid_len += frame_len as u64;

            if crc32fast::hash(payload) != crc {
                warn!(offset = frame_offset, "CRC mismatch; skipping commit log frame");
                recovery.skipped += 1;
                continue;
            }
            match bincode::deserialize::<LogEntry>(payload) {
                Ok(entry) => recovery.entries.push(entry),
                Err(e) => {
                    warn!(
                        offset = frame_offset,
                        error = %e,
                        "undecodable commit log frame; skipping"
                    );
                    recovery.skipped += 1;
                }
            }
        }

        if !rest.is_empty() {
            warn!(
                valid_len = recovery.valid_len,
                trailing = rest.len(),
                "torn commit log tail"
            );
        }
        debug!(
            recovered = recovery.entries.len(),
            skipped = recovery.skipped,
            "commit log recovery complete"
        );
        Ok(recovery)
    }

    /// Cut the log back to `len` bytes and continue appending from there.
    pub fn truncate(&self, len: u64) -> StoreResult<()> {
        let mut w = self.lock()?;
        w.writer.flush()?;
        let file = w.writer.get_ref();
        file.set_len(len)?;
        file.sync_all()?;
        w.offset = len;
        debug!(len, "commit log truncated");
        Ok(())
    }

    /// Replace the log's contents with `entries`.
    ///
    /// The new log is written to a temporary file in the same directory and
    /// renamed over the old one, so a crash leaves either the old or the new
    /// log intact.
    pub fn rewrite(&self, entries: &[LogEntry]) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut w = self.lock()?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut written: u64 = 0;
        for entry in entries {
            let frame = encode_frame(entry)?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        let (writer, offset) = open_append(&self.path)?;
        debug_assert_eq!(offset, written);
        w.writer = writer;
        w.offset = offset;

        debug!(entries = entries.len(), bytes = written, "commit log rewritten");
        Ok(())
    }

    /// Current write offset (the log's length in bytes).
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, LogWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn open_append(path: &Path) -> StoreResult<(BufWriter<File>, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let offset = file.metadata()?.len();
    Ok((BufWriter::new(file), offset))
}

/// Split the first frame off `buf` as `(payload, crc, frame length)`.
/// `None` if `buf` does not start with a whole, non-empty frame.
fn split_frame(buf: &[u8]) -> Option<(&[u8], u32, usize)> {
    let (len_bytes, rest) = buf.split_first_chunk::<4>()?;
    let (crc_bytes, rest) = rest.split_first_chunk::<4>()?;
    let length = u32::from_le_bytes(*len_bytes) as usize;
    if length == 0 {
        return None;
    }
    let payload = rest.get(..length)?;
    Some((payload, u32::from_le_bytes(*crc_bytes), HEADER_SIZE + length))
}

fn encode_frame(entry: &LogEntry) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Serialization(format!("entry too large: {} bytes", payload.len()))
    })?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
