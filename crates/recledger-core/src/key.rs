//! Key scheme: namespace prefix plus fixed-width, zero-padded decimal index.
//!
//! Canonical keys look like `REC0000`, `REC0001`, … With every index padded
//! to the same width, byte-wise key order equals numeric index order for all
//! `10^width` indices, so range scans return records in index order.
//!
//! The namespace window `[PREFIX + "0"*width, PREFIX + ":")` covers every
//! canonical key (`':'` is the byte after `'9'`).
//!
//! Input rules for [`KeyScheme::parse`]:
//! - a bare index: `"2"`
//! - a prefixed index, padded or not: `"REC2"`, `"REC0002"`
//! - at most `width` digits, value below `10^width`

use std::ops::Range;

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_PREFIX: &str = "REC";
pub const DEFAULT_WIDTH: usize = 4;
/// Widest index that still fits in a `u64` capacity.
pub const MAX_WIDTH: usize = 18;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
    width: usize,
}

impl KeyScheme {
    pub fn new(prefix: impl Into<String>, width: usize) -> LedgerResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(LedgerError::Config("key prefix must not be empty".into()));
        }
        if prefix
            .chars()
            .any(|c| c.is_ascii_digit() || c == ':' || c.is_whitespace())
        {
            return Err(LedgerError::Config(format!(
                "key prefix {prefix:?} must not contain digits, ':' or whitespace"
            )));
        }
        if width == 0 || width > MAX_WIDTH {
            return Err(LedgerError::Config(format!(
                "key width must be between 1 and {MAX_WIDTH}, got {width}"
            )));
        }
        Ok(Self { prefix, width })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of distinct indices the scheme can address.
    pub fn capacity(&self) -> u64 {
        10u64.pow(self.width as u32)
    }

    /// Canonical key for `index`.
    pub fn key(&self, index: u64) -> LedgerResult<String> {
        if index >= self.capacity() {
            return Err(LedgerError::KeyOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(format!("{}{:0width$}", self.prefix, index, width = self.width))
    }

    /// Parse a bare index or a prefixed key into an index.
    pub fn parse(&self, input: &str) -> LedgerResult<u64> {
        let invalid = |reason: String| LedgerError::InvalidKey {
            key: input.to_string(),
            reason,
        };

        let digits = input.strip_prefix(self.prefix.as_str()).unwrap_or(input);
        if digits.is_empty() {
            return Err(invalid("no index digits".into()));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!(
                "expected {}<digits> or a bare index",
                self.prefix
            )));
        }
        if digits.len() > self.width {
            return Err(invalid(format!(
                "index has more than {} digits",
                self.width
            )));
        }

        // At most MAX_WIDTH digits, so this cannot overflow.
        digits
            .parse::<u64>()
            .map_err(|e| invalid(e.to_string()))
    }

    /// Parse `input` and return its canonical key.
    pub fn canonicalize(&self, input: &str) -> LedgerResult<String> {
        self.key(self.parse(input)?)
    }

    /// Whether `key` is a canonical key of this scheme.
    pub fn owns(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix.as_str())
            .is_some_and(|d| d.len() == self.width && d.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Half-open bounds covering every canonical key.
    pub fn namespace_range(&self) -> (String, String) {
        (
            format!("{}{}", self.prefix, "0".repeat(self.width)),
            format!("{}:", self.prefix),
        )
    }

    /// Half-open key bounds for an index range. An end at or past capacity
    /// extends to the end of the namespace.
    pub fn index_range(&self, range: Range<u64>) -> LedgerResult<(String, String)> {
        if range.start > range.end {
            return Err(LedgerError::InvalidKey {
                key: format!("{}..{}", range.start, range.end),
                reason: "range start is after its end".into(),
            });
        }
        let start = if range.start >= self.capacity() {
            self.namespace_range().1
        } else {
            self.key(range.start)?
        };
        let end = if range.end >= self.capacity() {
            self.namespace_range().1
        } else {
            self.key(range.end)?
        };
        Ok((start, end))
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            width: DEFAULT_WIDTH,
        }
    }
}
