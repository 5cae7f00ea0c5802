pub mod core;
pub mod engine;
pub mod report;
pub mod run_cmd;
pub mod storage;

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{0}")]
    UnsupportedRuntime(String),
    #[error("invalid value for {field}: {message}")]
    InvalidArgument { field: String, message: String },
    #[error("invalid configuration ({field}): {message}")]
    Configuration { field: String, message: String },
    #[error("failed to install {component}: {reason}")]
    ToolInstall { component: String, reason: String },
    #[error("build failed: {0}")]
    BuildFailure(String),
    #[error("benchmarks for {framework} failed: {message}")]
    RunFailure {
        framework: String,
        message: String,
        fatal: bool,
    },
    #[error("report generation failed: {0}")]
    Report(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        BenchError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        BenchError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BenchError::Io {
            context: context.into(),
            source,
        }
    }

    /// True when a run failure must stop the framework matrix.
    pub fn is_fatal_run_failure(&self) -> bool {
        matches!(self, BenchError::RunFailure { fatal: true, .. })
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

// Shared helpers
pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> BenchResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| BenchError::io(format!("failed to create {}", dir.display()), e))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| BenchError::Message(format!("failed to serialize {}: {e}", path.display())))?;
    std::fs::write(path, json)
        .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
