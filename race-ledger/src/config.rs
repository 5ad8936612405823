//! Configuration for the race ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Writer actor mailbox capacity
    pub mailbox_capacity: usize,

    /// Seed the default grid when the driver catalog is incomplete
    pub seed_catalog: bool,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Roster rules
    pub rosters: RosterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/race-ledger"),
            service_name: "race-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 64,
            seed_catalog: true,
            rocksdb: RocksDBConfig::default(),
            rosters: RosterConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 16,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Roster rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Maximum total price of a roster
    pub budget_limit: Decimal,

    /// Maximum rosters per owner
    pub max_per_owner: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            budget_limit: Decimal::from(100),
            max_per_owner: 5,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("RACE_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(seed) = std::env::var("RACE_LEDGER_SEED_CATALOG") {
            config.seed_catalog = seed.parse().map_err(|_| {
                crate::Error::Config(format!("RACE_LEDGER_SEED_CATALOG is not a bool: {}", seed))
            })?;
        }

        if let Ok(limit) = std::env::var("RACE_LEDGER_BUDGET_LIMIT") {
            config.rosters.budget_limit = limit.parse().map_err(|_| {
                crate::Error::Config(format!("RACE_LEDGER_BUDGET_LIMIT is not a decimal: {}", limit))
            })?;
        }

        if let Ok(capacity) = std::env::var("RACE_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "RACE_LEDGER_MAILBOX_CAPACITY is not a number: {}",
                    capacity
                ))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "race-ledger");
        assert_eq!(config.rosters.budget_limit, Decimal::from(100));
        assert_eq!(config.rosters.max_per_owner, 5);
        assert!(config.seed_catalog);
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            data_dir = "/var/lib/race-ledger"
            service_name = "race-ledger"
            service_version = "0.1.0"
            mailbox_capacity = 8
            seed_catalog = false

            [rocksdb]
            write_buffer_size_mb = 8
            max_write_buffer_number = 2
            max_background_jobs = 1
            enable_statistics = false

            [rosters]
            budget_limit = "102.5"
            max_per_owner = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/race-ledger"));
        assert!(!config.seed_catalog);
        assert_eq!(config.rosters.budget_limit, Decimal::new(1025, 1));
        assert_eq!(config.rosters.max_per_owner, 3);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        let err = Config::from_toml("data_dir = [").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
