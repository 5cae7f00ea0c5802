//! Host prerequisites checked before any argument is parsed.

use crate::{BenchError, BenchResult};

/// Oldest host versions the orchestrator and the toolchain it installs support.
const MINIMUM_VERSIONS: &[(&str, (u32, u32))] =
    &[("linux", (3, 2)), ("macos", (10, 12)), ("windows", (10, 0))];

/// The host the orchestrator is running on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRuntime {
    /// `std::env::consts::OS` spelling (linux, macos, windows, ...)
    pub os: String,
    /// Kernel version on Linux, OS version elsewhere, when detectable
    pub version: Option<String>,
}

impl HostRuntime {
    pub fn new(os: impl Into<String>, version: Option<String>) -> Self {
        HostRuntime {
            os: os.into(),
            version,
        }
    }

    /// Detect the current host.
    pub fn detect() -> Self {
        use sysinfo::System;

        let os = std::env::consts::OS.to_string();
        let version = if os == "linux" {
            System::kernel_version()
        } else {
            System::os_version()
        };
        HostRuntime { os, version }
    }

    /// Fail with `UnsupportedRuntime` when the host is unknown or too old.
    ///
    /// An undetectable version is accepted; only a version known to be
    /// older than the minimum is rejected.
    pub fn validate(&self) -> BenchResult<()> {
        let Some((_, minimum)) = MINIMUM_VERSIONS.iter().find(|(os, _)| *os == self.os) else {
            return Err(BenchError::UnsupportedRuntime(format!(
                "unsupported host operating system '{}' (supported: linux, macos, windows)",
                self.os
            )));
        };

        let Some(found) = self.version.as_deref().and_then(parse_version_prefix) else {
            return Ok(());
        };

        if found < *minimum {
            return Err(BenchError::UnsupportedRuntime(format!(
                "{} {}.{} or newer is required (found {})",
                self.os,
                minimum.0,
                minimum.1,
                self.version.as_deref().unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Leading `major[.minor]` of a version string such as `6.5.0-1-generic`.
fn parse_version_prefix(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.trim().split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_matches_compile_target() {
        let host = HostRuntime::detect();
        assert_eq!(host.os, std::env::consts::OS);
    }

    #[test]
    fn test_modern_linux_is_supported() {
        let host = HostRuntime::new("linux", Some("6.5.0-14-generic".into()));
        assert!(host.validate().is_ok());
    }

    #[test]
    fn test_old_linux_is_rejected() {
        let host = HostRuntime::new("linux", Some("2.6.32".into()));
        let err = host.validate().unwrap_err();
        assert!(matches!(err, BenchError::UnsupportedRuntime(_)));
        assert!(err.to_string().contains("3.2 or newer"));
    }

    #[test]
    fn test_unknown_os_is_rejected() {
        let host = HostRuntime::new("plan9", None);
        assert!(matches!(host.validate(), Err(BenchError::UnsupportedRuntime(_))));
    }

    #[test]
    fn test_undetectable_version_is_accepted() {
        assert!(HostRuntime::new("macos", None).validate().is_ok());
        assert!(HostRuntime::new("windows", Some("unknown".into())).validate().is_ok());
    }

    #[test]
    fn test_parse_version_prefix() {
        assert_eq!(parse_version_prefix("10.15.7"), Some((10, 15)));
        assert_eq!(parse_version_prefix("11"), Some((11, 0)));
        assert_eq!(parse_version_prefix("abc"), None);
    }
}
