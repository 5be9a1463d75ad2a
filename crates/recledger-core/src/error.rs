use recledger_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No record is stored at the key.
    #[error("{key} does not exist")]
    NotFound { key: String },

    /// A stored value does not decode into the record schema.
    #[error("record at {key} does not match the schema: {reason}")]
    Decode { key: String, reason: String },

    /// The underlying world-state call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record supplied by the caller does not fit the schema.
    #[error("schema violation: {reason}")]
    SchemaViolation { reason: String },

    /// The named field is not part of the schema.
    #[error("unknown field: {field}")]
    UnknownField { field: String },

    /// The named field exists but is not declared mutable.
    #[error("field is not mutable: {field}")]
    ImmutableField { field: String },

    /// A key or index string could not be parsed under the key scheme.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// An index does not fit in the key scheme's fixed width.
    #[error("index {index} out of range (capacity {capacity})")]
    KeyOutOfRange { index: u64, capacity: u64 },

    /// Ledger configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
