//! Configuration schema and loading.
//!
//! An `AttestConfig` is deserialized from TOML.  The `[append]` table is
//! mandatory: the retry budget for conditional appends has no built-in
//! default.  Everything else falls back to the values documented on each
//! field.
//!
//! ```toml
//! [ledger]
//! difficulty = 4
//! mining_timeout_ms = 30000
//!
//! [append]
//! max_attempts = 5
//! backoff_ms = 20
//!
//! [storage]
//! data_dir = "./attest-data"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use attest_contracts::{
    error::{AttestError, AttestResult},
    policy::AppendPolicy,
};
use attest_core::hasher::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestConfig {
    #[serde(default)]
    pub ledger: LedgerSettings,

    pub append: AppendSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// `[ledger]`: proof-of-work parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Leading zero hex digits a block hash must have.  At most 64.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,

    /// Per-block mining budget.  No timeout when absent.
    #[serde(default)]
    pub mining_timeout_ms: Option<u64>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_timeout_ms: None,
        }
    }
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

/// `[append]`: retry budget for conditional appends.  Both keys required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendSettings {
    /// Total attempts including the first.  Must be at least 1.
    pub max_attempts: u32,

    /// Base backoff; attempt `n` waits `n * backoff_ms` before retrying.
    pub backoff_ms: u64,
}

/// `[storage]`: where the JSONL files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./attest-data")
}

impl StorageSettings {
    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join("audit.jsonl")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.jsonl")
    }
}

impl AttestConfig {
    /// Parse and validate `s`.
    ///
    /// Returns `AttestError::ConfigError` if the TOML is malformed, lacks the
    /// `[append]` table, or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> AttestResult<Self> {
        let config: AttestConfig = toml::from_str(s).map_err(|e| AttestError::ConfigError {
            reason: format!("failed to parse attest TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            difficulty = config.ledger.difficulty,
            max_attempts = config.append.max_attempts,
            data_dir = %config.storage.data_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it with `from_toml_str`.
    pub fn from_file(path: &Path) -> AttestResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AttestError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> AttestResult<()> {
        if self.ledger.difficulty > MAX_DIFFICULTY {
            return Err(AttestError::ConfigError {
                reason: format!(
                    "ledger.difficulty {} exceeds the maximum of {}",
                    self.ledger.difficulty, MAX_DIFFICULTY
                ),
            });
        }
        if self.append.max_attempts == 0 {
            return Err(AttestError::ConfigError {
                reason: "append.max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn append_policy(&self) -> AppendPolicy {
        AppendPolicy::new(
            self.append.max_attempts,
            Duration::from_millis(self.append.backoff_ms),
        )
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.ledger.mining_timeout_ms.map(Duration::from_millis)
    }
}
