use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::key::{DEFAULT_PREFIX, DEFAULT_WIDTH, KeyScheme};
use crate::ledger::{LedgerLayout, SeedPolicy};
use crate::schema::{DEFAULT_FIELDS, DEFAULT_MUTABLE_FIELDS, RecordSchema};

/// Ledger configuration as read from the `[keys]`, `[schema]` and `[seed]`
/// tables of a TOML file. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub keys: KeysConfig,
    pub schema: SchemaConfig,
    pub seed: SeedConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub prefix: String,
    pub width: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            width: DEFAULT_WIDTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub fields: Vec<String>,
    pub mutable: Vec<String>,
    pub allow_unknown_fields: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            mutable: DEFAULT_MUTABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
            allow_unknown_fields: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub policy: SeedPolicy,
    /// JSON array of records to seed instead of the built-in set.
    pub records_file: Option<PathBuf>,
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Validate the configuration and build the layout it describes.
    pub fn layout(&self) -> LedgerResult<LedgerLayout> {
        let schema = RecordSchema::new(
            self.schema.fields.iter().cloned(),
            self.schema.mutable.iter().cloned(),
        )?
        .allow_unknown_fields(self.schema.allow_unknown_fields);
        let keys = KeyScheme::new(self.keys.prefix.clone(), self.keys.width)?;
        Ok(LedgerLayout::new(schema, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.layout().unwrap(), LedgerLayout::default());
        assert_eq!(config.seed.policy, SeedPolicy::SkipIfPopulated);
    }

    #[test]
    fn parses_all_tables() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [keys]
            prefix = "CAR"
            width = 6

            [schema]
            fields = ["make", "model", "colour", "owner"]
            mutable = ["owner"]
            allow_unknown_fields = true

            [seed]
            policy = "overwrite"
            records_file = "cars.json"
            "#,
        )
        .unwrap();

        let layout = config.layout().unwrap();
        assert_eq!(layout.keys.key(7).unwrap(), "CAR000007");
        assert!(layout.schema.is_mutable("owner"));
        assert!(layout.schema.allows_unknown_fields());
        assert_eq!(config.seed.policy, SeedPolicy::Overwrite);
        assert_eq!(config.seed.records_file, Some(PathBuf::from("cars.json")));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let config = LedgerConfig::from_toml_str("[keys]\nwidth = 0\n").unwrap();
        assert!(matches!(config.layout(), Err(LedgerError::Config(_))));

        let config =
            LedgerConfig::from_toml_str("[schema]\nfields = [\"a\"]\nmutable = [\"b\"]\n").unwrap();
        assert!(matches!(config.layout(), Err(LedgerError::Config(_))));

        assert!(matches!(
            LedgerConfig::from_toml_str("[seed]\npolicy = \"sometimes\"\n"),
            Err(LedgerError::Config(_))
        ));
    }
}
