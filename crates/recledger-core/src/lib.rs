//! Record ledger core.
//!
//! This crate keeps a set of structured records in an ordered world-state
//! store. It provides:
//! - `RecordSchema` and `Record`, with strict canonical JSON encoding
//! - `KeyScheme`: prefix plus fixed-width zero-padded index keys, so key
//!   order is index order
//! - `RecordLedger`: create / read / range-list / update / seed, bound to one
//!   transaction
//! - `Dispatcher`: named function invocations, one transaction each, with
//!   structured `Response`s
//! - `LedgerConfig`: the `[keys]`, `[schema]` and `[seed]` TOML tables

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod genesis;
pub mod key;
pub mod ledger;
pub mod record;
pub mod schema;

pub use config::{KeysConfig, LedgerConfig, SchemaConfig, SeedConfig};
pub use dispatch::{DispatchError, Dispatcher, ErrorKind, Function, Invocation, Response};
pub use error::{LedgerError, LedgerResult};
pub use genesis::default_records;
pub use key::KeyScheme;
pub use ledger::{LedgerLayout, RecordLedger, RecordRange, SeedPolicy, SeedReport};
pub use record::{QueryResult, Record};
pub use schema::RecordSchema;
