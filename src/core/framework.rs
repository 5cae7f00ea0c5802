//! Target framework monikers and the toolchain channels that serve them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

/// Oldest `netX.Y` major; anything before it is spelled `netcoreappX.Y`.
const FIRST_UNIFIED_MAJOR: u32 = 5;

/// A validated target framework moniker such as `net6.0` or `netcoreapp3.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FrameworkMoniker {
    major: u32,
    minor: u32,
}

impl FrameworkMoniker {
    /// Parse a moniker. `netcoreapp5.0` and later are normalised to `net5.0`.
    pub fn parse(raw: &str) -> BenchResult<Self> {
        let value = raw.trim().to_ascii_lowercase();
        let (version, legacy) = if let Some(rest) = value.strip_prefix("netcoreapp") {
            (rest, true)
        } else if let Some(rest) = value.strip_prefix("net") {
            (rest, false)
        } else {
            return Err(unknown_moniker(raw));
        };

        let (major, minor) = parse_major_minor(version).ok_or_else(|| unknown_moniker(raw))?;
        if !legacy && major < FIRST_UNIFIED_MAJOR {
            return Err(unknown_moniker(raw));
        }
        if legacy && major < 2 {
            return Err(unknown_moniker(raw));
        }
        Ok(FrameworkMoniker { major, minor })
    }

    /// The toolchain channel that provides this framework.
    pub fn channel(&self) -> ToolchainChannel {
        ToolchainChannel(format!("{}.{}", self.major, self.minor))
    }

    pub fn as_string(&self) -> String {
        if self.major >= FIRST_UNIFIED_MAJOR {
            format!("net{}.{}", self.major, self.minor)
        } else {
            format!("netcoreapp{}.{}", self.major, self.minor)
        }
    }
}

impl fmt::Display for FrameworkMoniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<FrameworkMoniker> for String {
    fn from(value: FrameworkMoniker) -> Self {
        value.as_string()
    }
}

impl TryFrom<String> for FrameworkMoniker {
    type Error = BenchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FrameworkMoniker::parse(&value)
    }
}

/// Major.minor version track used to pick a toolchain build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolchainChannel(String);

impl ToolchainChannel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolchainChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    if !major.bytes().all(|b| b.is_ascii_digit()) || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn unknown_moniker(raw: &str) -> BenchError {
    BenchError::invalid_argument(
        "--frameworks",
        format!("unsupported target framework moniker '{raw}' (expected netcoreappX.Y or netX.Y)"),
    )
}

/// Parse every requested moniker, dropping later duplicates.
pub fn parse_monikers<S: AsRef<str>>(requested: &[S]) -> BenchResult<Vec<FrameworkMoniker>> {
    let mut monikers: Vec<FrameworkMoniker> = Vec::with_capacity(requested.len());
    for raw in requested {
        let moniker = FrameworkMoniker::parse(raw.as_ref())?;
        if !monikers.contains(&moniker) {
            monikers.push(moniker);
        }
    }
    Ok(monikers)
}

/// Distinct channels needed by `monikers`, in first-seen order.
pub fn resolve_channels(monikers: &[FrameworkMoniker]) -> Vec<ToolchainChannel> {
    let mut channels: Vec<ToolchainChannel> = Vec::new();
    for channel in monikers.iter().map(FrameworkMoniker::channel) {
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    channels
}

/// `net6.0;net7.0` form consumed by the project build.
pub fn join_monikers(monikers: &[FrameworkMoniker]) -> String {
    monikers
        .iter()
        .map(FrameworkMoniker::as_string)
        .collect::<Vec<_>>()
        .join(";")
}
