//! JSONL (JSON Lines) log of benchmark runs.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::BenchError;
use crate::core::FrameworkMoniker;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// One framework's run as persisted in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub schema_version: u32,
    pub framework: FrameworkMoniker,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl RunRecord {
    pub fn new(
        framework: FrameworkMoniker,
        status: RunStatus,
        message: Option<String>,
        duration_ms: u64,
    ) -> Self {
        RunRecord {
            schema_version: SCHEMA_VERSION,
            framework,
            status,
            message,
            duration_ms,
            timestamp: crate::now_string(),
        }
    }
}

/// Append-only run log.
///
/// Each record is stored as a single JSON line, so a crashed invocation
/// still leaves every completed run readable.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Create a RunLog for the given path.
    ///
    /// The file will be created if it doesn't exist when writing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        RunLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the path to the JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record.
    pub fn append(&self, record: &RunRecord) -> Result<(), BenchError> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "schema version mismatch: record has v{}, expected v{}",
                record.schema_version, SCHEMA_VERSION
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::io("failed to create directory", e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;

        let json = serde_json::to_string(record)
            .map_err(|e| BenchError::Message(format!("failed to serialize record: {e}")))?;

        writeln!(file, "{}", json).map_err(|e| BenchError::io("failed to write record", e))?;

        Ok(())
    }

    /// Read all records. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<RunRecord>, BenchError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result
                .map_err(|e| BenchError::io(format!("failed to read line {}", line_num + 1), e))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: RunRecord = serde_json::from_str(&line).map_err(|e| {
                BenchError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Start a fresh log for this invocation.
    pub fn truncate(&self) -> Result<(), BenchError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BenchError::io(format!("failed to reset {}", self.path.display()), e)),
        }
    }
}
