//! Append-only newline-delimited JSON files.
//!
//! `JsonlFile` is the durable backing used by the file stores.  The file is
//! opened in append mode, read back in full on open, and each record is
//! written as one line with a single `write_all` followed by a flush.  There
//! is no API to rewrite a line.
//!
//! A record is only ever written whole.  If a write or flush fails, the file
//! is cut back to its length before the append.  If the process died
//! mid-write instead, `open` finds bytes after the last newline: a tail that
//! parses as a record gets its newline, anything else is cut off with a
//! warning.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use attest_contracts::error::{AttestError, AttestResult};

/// An open append-only JSONL file.
#[derive(Debug)]
pub struct JsonlFile {
    path: PathBuf,
    file: File,
}

impl JsonlFile {
    /// Open (creating if needed) the file at `path` and parse every existing
    /// line as a `T`.
    ///
    /// Blank lines are skipped.  A complete line that does not parse is
    /// reported as `Serialization` with its 1-based line number and the file
    /// is left alone.  Only an unterminated last line is repaired.
    pub fn open<T: DeserializeOwned>(path: impl AsRef<Path>) -> AttestResult<(Self, Vec<T>)> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AttestError::ReadFailure {
                    reason: format!("failed to create directory '{}': {}", parent.display(), e),
                })?;
            }
        }

        let contents = if path.exists() {
            std::fs::read(&path).map_err(|e| AttestError::ReadFailure {
                reason: format!("failed to read '{}': {}", path.display(), e),
            })?
        } else {
            Vec::new()
        };

        let complete = contents
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let mut records = Self::parse_lines(&path, &contents[..complete])?;

        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AttestError::ReadFailure {
                reason: format!("failed to open '{}': {}", path.display(), e),
            })?;
        let mut file = Self { path, file: handle };

        let tail = &contents[complete..];
        if !tail.iter().all(u8::is_ascii_whitespace) {
            match serde_json::from_slice::<T>(tail) {
                Ok(record) => {
                    warn!(path = %file.path.display(), "last record had no newline; terminating it");
                    file.write_bytes(b"\n")?;
                    records.push(record);
                }
                Err(e) => {
                    warn!(
                        path = %file.path.display(),
                        bytes = tail.len(),
                        error = %e,
                        "discarding torn record at end of file"
                    );
                    file.truncate(complete as u64)?;
                }
            }
        } else if !tail.is_empty() {
            file.truncate(complete as u64)?;
        }

        debug!(path = %file.path.display(), records = records.len(), "opened jsonl file");

        Ok((file, records))
    }

    fn parse_lines<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> AttestResult<Vec<T>> {
        let mut records = Vec::new();
        for (line_no, line) in bytes.split(|&b| b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = serde_json::from_slice(line).map_err(|e| AttestError::Serialization {
                reason: format!("{} line {}: {}", path.display(), line_no + 1, e),
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Append `record` as one line.
    pub fn append<T: Serialize>(&mut self, record: &T) -> AttestResult<()> {
        let mut line = serde_json::to_string(record).map_err(|e| AttestError::Serialization {
            reason: format!("failed to encode record: {}", e),
        })?;
        line.push('\n');
        self.write_bytes(line.as_bytes())
    }

    /// Write `bytes` at the end of the file, or leave the file as it was.
    fn write_bytes(&mut self, bytes: &[u8]) -> AttestResult<()> {
        let start = self
            .file
            .metadata()
            .map_err(|e| AttestError::WriteFailure {
                reason: format!("failed to stat '{}': {}", self.path.display(), e),
            })?
            .len();

        let written = self.file.write_all(bytes).and_then(|_| self.file.flush());
        if let Err(e) = written {
            if let Err(rollback) = self.file.set_len(start) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial append"
                );
            }
            return Err(AttestError::WriteFailure {
                reason: format!("failed to append to '{}': {}", self.path.display(), e),
            });
        }
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> AttestResult<()> {
        self.file.set_len(len).map_err(|e| AttestError::WriteFailure {
            reason: format!("failed to truncate '{}': {}", self.path.display(), e),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
