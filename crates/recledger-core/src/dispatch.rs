//! Invocation dispatch: one named function call, one transaction.
//!
//! An [`Invocation`] names a ledger function and its string arguments, in
//! the `{"function": "...", "Args": [...]}` shape used by the submission
//! tooling. The [`Dispatcher`] opens a transaction, runs the matching ledger
//! operation, commits on success and aborts on failure, and reports either a
//! JSON payload or a structured error carrying the error kind and, when there
//! is one, the offending key.

use std::fmt;
use std::str::FromStr;

use recledger_store::{Transaction, WorldState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::genesis;
use crate::key::KeyScheme;
use crate::ledger::{LedgerLayout, RecordLedger, SeedPolicy};
use crate::record::Record;
use crate::schema::OWNER_FIELD;

/// A single function call submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,
    #[serde(rename = "Args", alias = "args", default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(text)
            .map_err(|e| DispatchError::bad_request(format!("malformed invocation: {e}")))
    }
}

/// Functions the dispatcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    InitLedger,
    CreateRecord,
    QueryRecord,
    QueryAllRecords,
    QueryRecordsByRange,
    ChangeRecordField,
    ChangeRecordOwner,
}

impl Function {
    pub const ALL: [Function; 7] = [
        Function::InitLedger,
        Function::CreateRecord,
        Function::QueryRecord,
        Function::QueryAllRecords,
        Function::QueryRecordsByRange,
        Function::ChangeRecordField,
        Function::ChangeRecordOwner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::InitLedger => "InitLedger",
            Function::CreateRecord => "CreateRecord",
            Function::QueryRecord => "QueryRecord",
            Function::QueryAllRecords => "QueryAllRecords",
            Function::QueryRecordsByRange => "QueryRecordsByRange",
            Function::ChangeRecordField => "ChangeRecordField",
            Function::ChangeRecordOwner => "ChangeRecordOwner",
        }
    }
}

impl FromStr for Function {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Function::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| DispatchError::bad_request(format!("unknown function: {s}")))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error categories reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Decode,
    Store,
    SchemaViolation,
    UnknownField,
    ImmutableField,
    InvalidKey,
    KeyOutOfRange,
    BadRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Structured failure of one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl DispatchError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            key: None,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            key: None,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for DispatchError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        let (kind, key) = match err {
            LedgerError::NotFound { key } => (ErrorKind::NotFound, Some(key)),
            LedgerError::Decode { key, .. } => (ErrorKind::Decode, Some(key)),
            LedgerError::InvalidKey { key, .. } => (ErrorKind::InvalidKey, Some(key)),
            LedgerError::Store(_) => (ErrorKind::Store, None),
            LedgerError::SchemaViolation { .. } => (ErrorKind::SchemaViolation, None),
            LedgerError::UnknownField { .. } => (ErrorKind::UnknownField, None),
            LedgerError::ImmutableField { .. } => (ErrorKind::ImmutableField, None),
            LedgerError::KeyOutOfRange { .. } => (ErrorKind::KeyOutOfRange, None),
            LedgerError::Config(_) => (ErrorKind::Internal, None),
        };
        Self { kind, key, message }
    }
}

impl From<recledger_store::StoreError> for DispatchError {
    fn from(err: recledger_store::StoreError) -> Self {
        LedgerError::from(err).into()
    }
}

/// Outcome of one invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { payload: Value },
    Error { error: DispatchError },
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Response::Ok { payload } => Some(payload),
            Response::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Response::Ok { .. } => None,
            Response::Error { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, DispatchError> {
        match self {
            Response::Ok { payload } => Ok(payload),
            Response::Error { error } => Err(error),
        }
    }
}

/// Routes invocations to ledger operations, one transaction each.
pub struct Dispatcher<'a, S: WorldState + ?Sized> {
    state: &'a S,
    layout: &'a LedgerLayout,
    seed_records: Vec<Record>,
    seed_policy: SeedPolicy,
}

impl<'a, S: WorldState + ?Sized> Dispatcher<'a, S> {
    /// Dispatcher seeding the built-in record set with
    /// [`SeedPolicy::SkipIfPopulated`].
    pub fn new(state: &'a S, layout: &'a LedgerLayout) -> Self {
        Self {
            state,
            layout,
            seed_records: genesis::default_records(),
            seed_policy: SeedPolicy::default(),
        }
    }

    /// Replace the records and policy `InitLedger` uses.
    pub fn with_seed(mut self, records: Vec<Record>, policy: SeedPolicy) -> Self {
        self.seed_records = records;
        self.seed_policy = policy;
        self
    }

    /// Parse and run a JSON invocation.
    pub fn invoke_json(&self, text: &str) -> Response {
        match Invocation::from_json(text) {
            Ok(invocation) => self.invoke(&invocation),
            Err(error) => Response::Error { error },
        }
    }

    /// Run one invocation in its own transaction.
    pub fn invoke(&self, invocation: &Invocation) -> Response {
        debug!(function = %invocation.function, args = invocation.args.len(), "invoke");
        let mut tx = Transaction::begin(self.state);

        let outcome = invocation
            .function
            .parse::<Function>()
            .and_then(|function| self.execute(&mut tx, function, &invocation.args));

        let outcome = match outcome {
            Ok(payload) => tx.commit().map(|_| payload).map_err(DispatchError::from),
            Err(error) => {
                tx.abort();
                Err(error)
            }
        };

        match outcome {
            Ok(payload) => Response::Ok { payload },
            Err(error) => {
                warn!(
                    function = %invocation.function,
                    kind = %error.kind,
                    key = error.key.as_deref().unwrap_or(""),
                    "invocation failed"
                );
                Response::Error { error }
            }
        }
    }

    fn execute(
        &self,
        tx: &mut Transaction<'_, S>,
        function: Function,
        args: &[String],
    ) -> Result<Value, DispatchError> {
        let keys = &self.layout.keys;
        let schema = &self.layout.schema;
        let mut ledger = RecordLedger::new(self.layout, tx);

        match function {
            Function::InitLedger => {
                expect_args(function, args, 0)?;
                let report = ledger.seed(&self.seed_records, self.seed_policy)?;
                to_payload(&report)
            }
            Function::CreateRecord => {
                expect_args(function, args, 1 + schema.fields().len())?;
                let index = keys.parse(&args[0])?;
                let record = schema.record_from_values(args[1..].iter().cloned())?;
                ledger.create(index, &record)?;
                Ok(Value::Null)
            }
            Function::QueryRecord => {
                expect_args(function, args, 1)?;
                let record = ledger.read(keys.parse(&args[0])?)?;
                to_payload(&record)
            }
            Function::QueryAllRecords => {
                expect_args(function, args, 0)?;
                let results = ledger.list_all()?.collect::<LedgerResult<Vec<_>>>()?;
                to_payload(&results)
            }
            Function::QueryRecordsByRange => {
                expect_args(function, args, 2)?;
                let (ns_start, ns_end) = keys.namespace_range();
                let start = range_bound(keys, &args[0], ns_start)?;
                let end = range_bound(keys, &args[1], ns_end)?;
                if start > end {
                    return Err(DispatchError::bad_request(format!(
                        "range start {start} is past range end {end}"
                    )));
                }
                let results = ledger
                    .list_by_range(&start, &end)?
                    .collect::<LedgerResult<Vec<_>>>()?;
                to_payload(&results)
            }
            Function::ChangeRecordField => {
                expect_args(function, args, 3)?;
                ledger.update(keys.parse(&args[0])?, &args[1], &args[2])?;
                Ok(Value::Null)
            }
            Function::ChangeRecordOwner => {
                expect_args(function, args, 2)?;
                ledger.update(keys.parse(&args[0])?, OWNER_FIELD, &args[1])?;
                Ok(Value::Null)
            }
        }
    }
}

fn expect_args(function: Function, args: &[String], expected: usize) -> Result<(), DispatchError> {
    if args.len() != expected {
        return Err(DispatchError::bad_request(format!(
            "{function} takes {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

/// An empty bound means the edge of the namespace; anything else is parsed
/// and canonicalized under the key scheme.
fn range_bound(
    keys: &KeyScheme,
    arg: &str,
    default: String,
) -> LedgerResult<String> {
    if arg.is_empty() {
        Ok(default)
    } else {
        keys.canonicalize(arg)
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::internal(e.to_string()))
}
