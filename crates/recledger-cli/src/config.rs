use std::path::{Path, PathBuf};

use anyhow::Context;
use recledger_core::{LedgerConfig, Record};
use recledger_store::StorageConfig;
use serde::{Deserialize, Serialize};

/// Everything the binary reads from its TOML file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `path`, or the defaults when no file is given. A relative
    /// `seed.records_file` is resolved against the file's directory.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("loading {}", path.display()))?;

        if let (Some(file), Some(dir)) = (config.ledger.seed.records_file.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = dir;
        }
        self
    }

    /// Records `init` writes: the configured JSON file, or `None` for the
    /// built-in set.
    pub fn seed_records(&self) -> anyhow::Result<Option<Vec<Record>>> {
        let Some(path) = &self.ledger.seed.records_file else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed records {}", path.display()))?;
        let records = serde_json::from_str(&text)
            .with_context(|| format!("parsing seed records {}", path.display()))?;
        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recledger_core::SeedPolicy;
    use recledger_store::SyncMode;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_ledger_and_storage_tables() {
        let config = AppConfig::from_toml_str(
            r#"
            [keys]
            prefix = "OPP"

            [seed]
            policy = "overwrite"

            [storage]
            data_dir = "/var/lib/recledger"
            sync_mode = "every-write"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.keys.prefix, "OPP");
        assert_eq!(config.ledger.keys.width, 4);
        assert_eq!(config.ledger.seed.policy, SeedPolicy::Overwrite);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/recledger"));
        assert_eq!(config.storage.sync_mode, SyncMode::EveryWrite);
        assert_eq!(config.storage.log_file, "commit.log");
    }

    #[test]
    fn data_dir_override() {
        let config = AppConfig::default().with_data_dir(Some("elsewhere".into()));
        assert_eq!(config.storage.data_dir, PathBuf::from("elsewhere"));
        let config = AppConfig::default().with_data_dir(None);
        assert_eq!(config.storage.data_dir, StorageConfig::default().data_dir);
    }

    #[test]
    fn seed_records_resolve_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("seed.json"),
            r#"[{"ID":"9","Name":"n","Description":"d","Stage":"s","TargetRevenue":"t",
                "Oppurtunity":"o","Partners":"p","StartDate":"sd","TeamMembers":"tm","Owner":""}]"#,
        )
        .unwrap();
        let path = dir.path().join("recledger.toml");
        std::fs::write(&path, "[seed]\nrecords_file = \"seed.json\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        let records = config.seed_records().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ID"), Some("9"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
