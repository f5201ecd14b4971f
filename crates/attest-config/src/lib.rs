//! # attest-config
//!
//! TOML configuration for an attest deployment: proof-of-work difficulty,
//! the append retry budget, and the data directory.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use attest_config::AttestConfig;
//!
//! let config = AttestConfig::from_file(Path::new("attest.toml"))?;
//! let log = SequentialAuditLog::new(store, config.append_policy());
//! ```

pub mod settings;

pub use settings::{AppendSettings, AttestConfig, LedgerSettings, StorageSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use attest_contracts::error::AttestError;

    use crate::AttestConfig;

    fn expect_config_error(toml: &str, needle: &str) {
        match AttestConfig::from_toml_str(toml) {
            Err(AttestError::ConfigError { reason }) => {
                assert!(reason.contains(needle), "unexpected reason: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    /// Every documented key is read.
    #[test]
    fn test_full_document() {
        let toml = r#"
            [ledger]
            difficulty = 5
            mining_timeout_ms = 30000

            [append]
            max_attempts = 5
            backoff_ms = 20

            [storage]
            data_dir = "/var/lib/attest"
        "#;

        let config = AttestConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger.difficulty, 5);
        assert_eq!(config.mining_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.append_policy().max_attempts, 5);
        assert_eq!(config.append_policy().delay_after(2), Duration::from_millis(40));
        assert_eq!(config.storage.ledger_path(), PathBuf::from("/var/lib/attest/ledger.jsonl"));
        assert_eq!(config.storage.audit_path(), PathBuf::from("/var/lib/attest/audit.jsonl"));
    }

    /// Only `[append]` is required.
    #[test]
    fn test_defaults_for_optional_tables() {
        let toml = r#"
            [append]
            max_attempts = 3
            backoff_ms = 0
        "#;

        let config = AttestConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger.difficulty, 4);
        assert_eq!(config.mining_timeout(), None);
        assert_eq!(config.storage.data_dir, PathBuf::from("./attest-data"));
    }

    #[test]
    fn test_difficulty_defaults_inside_ledger_table() {
        let toml = r#"
            [ledger]
            mining_timeout_ms = 10

            [append]
            max_attempts = 1
            backoff_ms = 0
        "#;

        let config = AttestConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger.difficulty, 4);
    }

    // ── Validation ────────────────────────────────────────────────────────────

    /// There is no guessed retry budget.
    #[test]
    fn test_missing_append_table_is_rejected() {
        expect_config_error("[ledger]\ndifficulty = 4\n", "append");
    }

    #[test]
    fn test_partial_append_table_is_rejected() {
        expect_config_error("[append]\nmax_attempts = 3\n", "backoff_ms");
    }

    #[test]
    fn test_difficulty_above_max_is_rejected() {
        expect_config_error(
            "[ledger]\ndifficulty = 65\n[append]\nmax_attempts = 1\nbackoff_ms = 0\n",
            "exceeds the maximum",
        );
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        expect_config_error(
            "[append]\nmax_attempts = 0\nbackoff_ms = 0\n",
            "max_attempts",
        );
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        expect_config_error("[append\nmax_attempts = ", "failed to parse");
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[append]\nmax_attempts = 2\nbackoff_ms = 5").unwrap();

        let config = AttestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.append.max_attempts, 2);
    }

    /// A missing file names the path in the error.
    #[test]
    fn test_missing_file() {
        let err = AttestConfig::from_file(Path::new("/nonexistent/attest.toml")).unwrap_err();
        match err {
            AttestError::ConfigError { reason } => assert!(reason.contains("/nonexistent/attest.toml")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }
}
