//! Record wire encoding.
//!
//! Records are stored as a compact JSON object mapping field names to string
//! values, with keys in sorted order. Because the encoder always emits that
//! exact form, `encode(decode(bytes)) == bytes` for anything it produced.
//!
//! Decoding is strict: missing schema fields and non-string values are
//! errors, and unknown fields are errors unless the schema allows them (in
//! which case they are dropped).

use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::record::Record;
use crate::schema::RecordSchema;

/// Encode a record after checking it against the schema.
pub fn encode(schema: &RecordSchema, record: &Record) -> LedgerResult<Vec<u8>> {
    schema.validate(record)?;
    serde_json::to_vec(record).map_err(|e| LedgerError::SchemaViolation {
        reason: format!("record is not encodable: {e}"),
    })
}

/// Decode the bytes stored at `key` into a record of `schema`.
pub fn decode(schema: &RecordSchema, key: &str, bytes: &[u8]) -> LedgerResult<Record> {
    let decode_err = |reason: String| LedgerError::Decode {
        key: key.to_string(),
        reason,
    };

    let raw: BTreeMap<String, String> =
        serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
    let mut record: Record = raw.into_iter().collect();

    let unknown: Vec<String> = record
        .field_names()
        .filter(|f| !schema.contains(f))
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        if !schema.allows_unknown_fields() {
            return Err(decode_err(format!("unknown fields: {}", unknown.join(", "))));
        }
        for field in &unknown {
            record.remove(field);
        }
    }

    let missing: Vec<&str> = schema
        .fields()
        .iter()
        .map(String::as_str)
        .filter(|f| record.get(f).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(decode_err(format!("missing fields: {}", missing.join(", "))));
    }

    Ok(record)
}
