//! Idempotent tool provisioning.
//!
//! The parameters that affect an install form an [`InstallKey`]. Its
//! fingerprint names a "done" flag in an [`InstallStateStore`]; the flag is
//! only set after every installer succeeded, so a partial failure is retried
//! from scratch on the next invocation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{Architecture, RunConfiguration, ToolchainChannel};
use crate::{BenchError, BenchResult};

use super::toolchain::{InstallRequest, Installer};

/// Parameters that fully determine a toolchain install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallKey {
    pub architecture: Architecture,
    pub version: Option<String>,
    pub channels: Vec<ToolchainChannel>,
    /// Command line that installs the reporting tool; empty when none is set.
    #[serde(default)]
    pub report_tool: Vec<String>,
}

impl InstallKey {
    pub fn new(
        architecture: Architecture,
        version: Option<String>,
        channels: Vec<ToolchainChannel>,
    ) -> Self {
        InstallKey {
            architecture,
            version,
            channels,
            report_tool: Vec::new(),
        }
    }

    pub fn with_report_tool(mut self, argv: Vec<String>) -> Self {
        self.report_tool = argv;
        self
    }

    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(
            config.architecture,
            config.toolchain_version.clone(),
            config.channels.clone(),
        )
        .with_report_tool(config.report_tool_install.clone())
    }

    /// Stable hex digest of the key.
    ///
    /// Channel order does not change what gets installed, so channels are
    /// sorted before hashing.
    pub fn fingerprint(&self) -> String {
        let mut channels: Vec<&str> = self.channels.iter().map(ToolchainChannel::as_str).collect();
        channels.sort_unstable();
        let canonical = format!(
            "arch={};version={};channels={};report_tool={:?}",
            self.architecture.as_str(),
            self.version.as_deref().unwrap_or("latest"),
            channels.join(","),
            self.report_tool
        );
        crate::sha256_hex(canonical.as_bytes())
    }
}

/// Key-value store of completed installs.
pub trait InstallStateStore: Send + Sync {
    fn is_done(&self, key: &InstallKey) -> BenchResult<bool>;

    fn mark_done(&self, key: &InstallKey) -> BenchResult<()>;
}

/// One marker file per key under a directory.
///
/// The marker holds the JSON-encoded key. A marker that is unreadable or
/// whose key has a different fingerprint counts as absent.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    dir: PathBuf,
}

impl MarkerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        MarkerStore { dir: dir.into() }
    }

    pub fn marker_path(&self, key: &InstallKey) -> PathBuf {
        self.dir.join(format!(".install-{}.done", &key.fingerprint()[..16]))
    }
}

impl InstallStateStore for MarkerStore {
    fn is_done(&self, key: &InstallKey) -> BenchResult<bool> {
        let path = self.marker_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                warn!(path = %path.display(), "unreadable install marker: {e}");
                return Ok(false);
            }
        };
        match serde_json::from_slice::<InstallKey>(&bytes) {
            Ok(recorded) if recorded.fingerprint() == key.fingerprint() => Ok(true),
            _ => {
                warn!(path = %path.display(), "ignoring corrupted install marker");
                Ok(false)
            }
        }
    }

    fn mark_done(&self, key: &InstallKey) -> BenchResult<()> {
        crate::write_json(&self.marker_path(key), key)
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    done: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget a completed install, as if its marker had been deleted.
    pub fn forget(&self, key: &InstallKey) {
        if let Ok(mut done) = self.done.lock() {
            done.remove(&key.fingerprint());
        }
    }
}

impl InstallStateStore for MemoryStore {
    fn is_done(&self, key: &InstallKey) -> BenchResult<bool> {
        self.done
            .lock()
            .map(|done| done.contains(&key.fingerprint()))
            .map_err(|_| BenchError::Message("install state lock poisoned".into()))
    }

    fn mark_done(&self, key: &InstallKey) -> BenchResult<()> {
        self.done
            .lock()
            .map(|mut done| {
                done.insert(key.fingerprint());
            })
            .map_err(|_| BenchError::Message("install state lock poisoned".into()))
    }
}

/// Whether `ensure_installed` did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStatus {
    Installed,
    AlreadyInstalled,
}

/// Installs the toolchain and the reporting tool at most once per key.
pub struct Provisioner<'a> {
    store: &'a dyn InstallStateStore,
    toolchain: &'a dyn Installer,
    report_tool: &'a dyn Installer,
    install_dir: PathBuf,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        store: &'a dyn InstallStateStore,
        toolchain: &'a dyn Installer,
        report_tool: &'a dyn Installer,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Provisioner {
            store,
            toolchain,
            report_tool,
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn ensure_installed(
        &self,
        key: &InstallKey,
        verbose: bool,
    ) -> BenchResult<ProvisionStatus> {
        if self.store.is_done(key)? {
            info!(fingerprint = %&key.fingerprint()[..16], "tools already installed, skipping");
            return Ok(ProvisionStatus::AlreadyInstalled);
        }

        info!("installing tools");
        let request = InstallRequest {
            architecture: key.architecture,
            version: key.version.as_deref(),
            channels: &key.channels,
            install_dir: &self.install_dir,
            verbose,
        };

        for installer in [self.toolchain, self.report_tool] {
            debug!(component = installer.name(), "running installer");
            installer.install(&request).map_err(|e| match e {
                e @ BenchError::ToolInstall { .. } => e,
                other => BenchError::ToolInstall {
                    component: installer.name().to_string(),
                    reason: other.to_string(),
                },
            })?;
        }

        self.store.mark_done(key)?;
        Ok(ProvisionStatus::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::framework::{parse_monikers, resolve_channels};
    use crate::engine::toolchain::MockInstaller;

    fn key(monikers: &[&str]) -> InstallKey {
        InstallKey::new(
            Architecture::X64,
            None,
            resolve_channels(&parse_monikers(monikers).unwrap()),
        )
    }

    #[test]
    fn test_fingerprint_depends_on_install_parameters() {
        let a = key(&["net6.0", "net7.0"]);
        let b = key(&["net7.0", "net6.0"]);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut pinned = a.clone();
        pinned.version = Some("7.0.100".into());
        assert_ne!(a.fingerprint(), pinned.fingerprint());

        let mut arm = a.clone();
        arm.architecture = Architecture::Arm64;
        assert_ne!(a.fingerprint(), arm.fingerprint());

        let with_tool = a.clone().with_report_tool(vec!["dotnet".into(), "tool".into()]);
        assert_ne!(a.fingerprint(), with_tool.fingerprint());
    }

    #[test]
    fn test_marker_matches_reordered_channels() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkerStore::new(dir.path());
        store.mark_done(&key(&["net6.0", "net7.0"])).unwrap();
        assert!(store.is_done(&key(&["net7.0", "net6.0"])).unwrap());
    }

    #[test]
    fn test_second_call_is_noop() {
        let store = MemoryStore::new();
        let toolchain = MockInstaller::new("toolchain");
        let report_tool = MockInstaller::new("report tool");
        let provisioner = Provisioner::new(&store, &toolchain, &report_tool, "tools/dotnet/x64");
        let key = key(&["net6.0"]);

        assert_eq!(
            provisioner.ensure_installed(&key, false).unwrap(),
            ProvisionStatus::Installed
        );
        assert_eq!(
            provisioner.ensure_installed(&key, false).unwrap(),
            ProvisionStatus::AlreadyInstalled
        );
        assert_eq!(toolchain.calls(), 1);
        assert_eq!(report_tool.calls(), 1);
    }

    #[test]
    fn test_toolchain_failure_writes_no_marker() {
        let store = MemoryStore::new();
        let toolchain = MockInstaller::new("toolchain").failing();
        let report_tool = MockInstaller::new("report tool");
        let provisioner = Provisioner::new(&store, &toolchain, &report_tool, "t");
        let key = key(&["net6.0"]);

        let err = provisioner.ensure_installed(&key, false).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ToolInstall { ref component, .. } if component == "toolchain"
        ));
        assert!(!store.is_done(&key).unwrap());
    }

    #[test]
    fn test_report_tool_failure_writes_no_marker() {
        let store = MemoryStore::new();
        let toolchain = MockInstaller::new("toolchain");
        let report_tool = MockInstaller::new("report tool").failing();
        let provisioner = Provisioner::new(&store, &toolchain, &report_tool, "t");
        let key = key(&["net6.0"]);

        let err = provisioner.ensure_installed(&key, false).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ToolInstall { ref component, .. } if component == "report tool"
        ));
        assert!(!store.is_done(&key).unwrap());
        assert_eq!(toolchain.calls(), 1);
    }

    #[test]
    fn test_forgotten_install_reruns() {
        let store = MemoryStore::new();
        let toolchain = MockInstaller::new("toolchain");
        let report_tool = MockInstaller::new("report tool");
        let provisioner = Provisioner::new(&store, &toolchain, &report_tool, "t");
        let key = key(&["net6.0"]);

        provisioner.ensure_installed(&key, false).unwrap();
        store.forget(&key);
        provisioner.ensure_installed(&key, false).unwrap();
        assert_eq!(toolchain.calls(), 2);
    }

    #[test]
    fn test_marker_path_is_keyed() {
        let store = MarkerStore::new("/tools");
        let a = store.marker_path(&key(&["net6.0"]));
        let b = store.marker_path(&key(&["net7.0"]));
        assert_ne!(a, b);
        assert!(a.starts_with("/tools"));
    }
}
