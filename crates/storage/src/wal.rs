// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable job storage

use crate::state::JobOperation;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error at entry {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    ///
    /// A torn final entry left by a crash is truncated away so new entries
    /// start on a clean line.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let valid_len = durable_len(&text);
        let sequence = text[..valid_len]
            .lines()
            .filter(|line| !line.is_empty())
            .count() as u64;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        if valid_len < text.len() {
            file.set_len(valid_len as u64)?;
        }

        Ok(Self { file, sequence })
    }

    /// Append an operation to the log
    pub fn append(&mut self, op: &JobOperation) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        // One write, so a crash cannot leave an entry without its newline
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;
        self.sequence += 1;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log
    ///
    /// Reads the same durable prefix that [`Wal::open`] keeps: a final entry
    /// that is unterminated or does not parse was torn by a crash and is
    /// skipped. A bad line anywhere else is corruption.
    pub fn replay(path: &Path) -> Result<Vec<JobOperation>, WalError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ops = Vec::new();
        for (index, line) in text[..durable_len(&text)].lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let entry = serde_json::from_str::<WalEntry>(line).map_err(|source| WalError::Json {
                line: index + 1,
                source,
            })?;
            ops.push(entry.op);
        }

        Ok(ops)
    }
}

/// Length of the log prefix that survives a crash
///
/// Everything but a torn final entry: one missing its newline or one that
/// does not parse.
fn durable_len(text: &str) -> usize {
    let mut valid_len = 0;
    for line in text.split_inclusive('\n') {
        let end = valid_len + line.len();
        let complete =
            line.ends_with('\n') && serde_json::from_str::<WalEntry>(line.trim_end()).is_ok();
        if !complete && end == text.len() {
            break;
        }
        valid_len = end;
    }
    valid_len
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: JobOperation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
