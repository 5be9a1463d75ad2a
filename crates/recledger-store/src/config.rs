use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flush/sync strategy for the commit log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every committed transaction.
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Where and how the durable world state keeps its commit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub log_file: String,
    pub sync_mode: SyncMode,
}

impl StorageConfig {
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".recledger"),
            log_file: "commit.log".into(),
            sync_mode: SyncMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StorageConfig::default();
        assert_eq!(c.log_path(), PathBuf::from(".recledger/commit.log"));
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
    }
}
