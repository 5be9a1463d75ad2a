//! The record schema: the one place field names are defined.
//!
//! A [`RecordSchema`] names every field a record carries, which of them may
//! be changed in place, and whether the decoder tolerates fields it does not
//! know. The codec, `create`, `update`, and the dispatcher all consult it.

use std::collections::BTreeSet;

use crate::error::{LedgerError, LedgerResult};
use crate::record::Record;

/// Field list of the default opportunity schema.
pub const DEFAULT_FIELDS: &[&str] = &[
    "ID",
    "Name",
    "Description",
    "Stage",
    "TargetRevenue",
    "Oppurtunity",
    "Partners",
    "StartDate",
    "TeamMembers",
    "Owner",
];

/// Fields of the default schema that support in-place update.
pub const DEFAULT_MUTABLE_FIELDS: &[&str] = &["Owner", "Stage"];

/// Field targeted by the `ChangeRecordOwner` shorthand.
pub const OWNER_FIELD: &str = "Owner";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<String>,
    mutable: BTreeSet<String>,
    allow_unknown_fields: bool,
}

impl RecordSchema {
    /// Build a schema from an ordered field list and its mutable subset.
    ///
    /// Fails if the list is empty, a name is blank or repeated, or a mutable
    /// field is not in the list.
    pub fn new<F, M>(fields: F, mutable: M) -> LedgerResult<Self>
    where
        F: IntoIterator,
        F::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(LedgerError::Config("schema has no fields".into()));
        }

        let mut seen = BTreeSet::new();
        for field in &fields {
            if field.trim().is_empty() {
                return Err(LedgerError::Config("schema field names must not be blank".into()));
            }
            if !seen.insert(field.as_str()) {
                return Err(LedgerError::Config(format!("duplicate schema field: {field}")));
            }
        }

        let mutable: BTreeSet<String> = mutable.into_iter().map(Into::into).collect();
        if let Some(stray) = mutable.iter().find(|m| !seen.contains(m.as_str())) {
            return Err(LedgerError::Config(format!(
                "mutable field {stray} is not a schema field"
            )));
        }

        Ok(Self {
            fields,
            mutable,
            allow_unknown_fields: false,
        })
    }

    /// Let the decoder drop fields the schema does not name instead of
    /// rejecting the record.
    pub fn allow_unknown_fields(mut self, allow: bool) -> Self {
        self.allow_unknown_fields = allow;
        self
    }

    pub fn allows_unknown_fields(&self) -> bool {
        self.allow_unknown_fields
    }

    /// Field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn mutable_fields(&self) -> impl Iterator<Item = &str> {
        self.mutable.iter().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn is_mutable(&self, field: &str) -> bool {
        self.mutable.contains(field)
    }

    /// Check that `field` may be updated in place.
    pub fn check_mutable(&self, field: &str) -> LedgerResult<()> {
        if !self.contains(field) {
            return Err(LedgerError::UnknownField {
                field: field.to_string(),
            });
        }
        if !self.is_mutable(field) {
            return Err(LedgerError::ImmutableField {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    /// Check that `record` carries exactly the schema's fields.
    pub fn validate(&self, record: &Record) -> LedgerResult<()> {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| record.get(f.as_str()).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::SchemaViolation {
                reason: format!("missing fields: {}", missing.join(", ")),
            });
        }

        let unknown: Vec<&str> = record
            .field_names()
            .filter(|f| !self.contains(f))
            .collect();
        if !unknown.is_empty() {
            return Err(LedgerError::SchemaViolation {
                reason: format!("unknown fields: {}", unknown.join(", ")),
            });
        }
        Ok(())
    }

    /// Build a record from values given in schema field order.
    pub fn record_from_values<I>(&self, values: I) -> LedgerResult<Record>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.fields.len() {
            return Err(LedgerError::SchemaViolation {
                reason: format!(
                    "expected {} field values, got {}",
                    self.fields.len(),
                    values.len()
                ),
            });
        }
        Ok(self.fields.iter().cloned().zip(values).collect())
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            mutable: DEFAULT_MUTABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
            allow_unknown_fields: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> RecordSchema {
        RecordSchema::new(["ID", "Name", "Owner"], ["Owner"]).unwrap()
    }

    #[test]
    fn default_schema_is_consistent() {
        let schema = RecordSchema::default();
        let rebuilt = RecordSchema::new(
            DEFAULT_FIELDS.iter().copied(),
            DEFAULT_MUTABLE_FIELDS.iter().copied(),
        )
        .unwrap();
        assert_eq!(schema, rebuilt);
        assert!(schema.is_mutable("Owner"));
        assert!(!schema.allows_unknown_fields());
    }

    #[test]
    fn rejects_bad_definitions() {
        let empty: [&str; 0] = [];
        assert!(matches!(RecordSchema::new(empty, empty), Err(LedgerError::Config(_))));
        assert!(matches!(
            RecordSchema::new(["ID", "ID"], empty),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            RecordSchema::new(["ID", " "], empty),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            RecordSchema::new(["ID"], ["Owner"]),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn check_mutable_distinguishes_unknown_and_immutable() {
        let schema = small();
        assert!(schema.check_mutable("Owner").is_ok());
        assert!(matches!(
            schema.check_mutable("Name"),
            Err(LedgerError::ImmutableField { .. })
        ));
        assert!(matches!(
            schema.check_mutable("Colour"),
            Err(LedgerError::UnknownField { .. })
        ));
    }

    #[test]
    fn validate_reports_missing_and_unknown() {
        let schema = small();
        let ok: Record = [("ID", "1"), ("Name", "a"), ("Owner", "")].into_iter().collect();
        assert!(schema.validate(&ok).is_ok());

        let missing: Record = [("ID", "1")].into_iter().collect();
        let err = schema.validate(&missing).unwrap_err();
        assert!(err.to_string().contains("Name, Owner"));

        let mut extra = ok.clone();
        extra.set("Colour", "red");
        assert!(matches!(
            schema.validate(&extra),
            Err(LedgerError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn record_from_values_follows_field_order() {
        let schema = small();
        let record = schema.record_from_values(["7", "Siva", "ops"]).unwrap();
        assert_eq!(record.get("ID"), Some("7"));
        assert_eq!(record.get("Owner"), Some("ops"));

        assert!(schema.record_from_values(["7"]).is_err());
    }
}
