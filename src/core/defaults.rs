//! Optional `microbench.toml` holding defaults for the command line.
//!
//! Values from the file sit between the built-in defaults and explicit flags:
//! a flag always wins.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{BenchError, BenchResult};

pub const DEFAULT_CONFIG_FILE: &str = "microbench.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileDefaults {
    pub architecture: Option<String>,
    pub toolchain_version: Option<String>,
    pub frameworks: Option<Vec<String>>,
    pub configuration: Option<String>,
    pub project: Option<PathBuf>,
    pub bin_directory: Option<PathBuf>,
    pub artifacts_directory: Option<PathBuf>,
    pub tools_directory: Option<PathBuf>,
    pub install_script: Option<PathBuf>,
    pub filters: Option<Vec<String>>,
    pub report: Option<ReportDefaults>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportDefaults {
    pub submission_type: Option<String>,
    pub submission_description: Option<String>,
}

impl FileDefaults {
    pub fn parse(contents: &str) -> BenchResult<Self> {
        toml::from_str(contents).map_err(|e| {
            BenchError::configuration("--config", format!("failed to parse config: {e}"))
        })
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            BenchError::configuration("--config", format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&s)
    }

    /// Load `explicit` if given, else `microbench.toml` in `dir` when present.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> BenchResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
