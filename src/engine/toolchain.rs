//! Installers for the toolchain and the reporting tool.
//!
//! An `Installer` performs one external install action. The provisioner
//! decides whether it needs to run at all; installers never check for
//! previous installs themselves.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{Architecture, ToolchainChannel};
use crate::{BenchError, BenchResult};

use super::process::run_logged;

/// Parameters of one install action.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub architecture: Architecture,
    pub version: Option<&'a str>,
    pub channels: &'a [ToolchainChannel],
    pub install_dir: &'a Path,
    pub verbose: bool,
}

/// Trait for external install actions.
pub trait Installer: Send + Sync {
    /// Component name used in logs and in `ToolInstall` errors.
    fn name(&self) -> &str;

    /// Perform the install. Any failure is reported as `ToolInstall`.
    fn install(&self, request: &InstallRequest<'_>) -> BenchResult<()>;
}

/// Default install location for a toolchain of the given architecture.
pub fn toolchain_dir(tools_directory: &Path, architecture: Architecture) -> PathBuf {
    tools_directory.join("dotnet").join(architecture.as_str())
}

/// Runs the toolchain install script.
///
/// A pinned version is installed with a single invocation; otherwise the
/// script runs once per channel.
pub struct ScriptInstaller {
    script: PathBuf,
}

impl ScriptInstaller {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        ScriptInstaller {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Command lines this installer would run for `request`.
    pub fn command_lines(&self, request: &InstallRequest<'_>) -> Vec<Vec<OsString>> {
        let mut base: Vec<OsString> = Vec::new();
        if self.script.extension().is_some_and(|e| e == "ps1") {
            base.extend(
                ["powershell.exe", "-NoProfile", "-ExecutionPolicy", "Bypass"]
                    .into_iter()
                    .map(OsString::from),
            );
        }
        base.push(self.script.clone().into_os_string());
        base.push("-InstallDir".into());
        base.push(request.install_dir.as_os_str().to_owned());
        base.push("-Architecture".into());
        base.push(request.architecture.as_str().into());

        match request.version {
            Some(version) => {
                let mut line = base;
                line.push("-Version".into());
                line.push(version.into());
                vec![line]
            }
            None => request
                .channels
                .iter()
                .map(|channel| {
                    let mut line = base.clone();
                    line.push("-Channel".into());
                    line.push(channel.as_str().into());
                    line
                })
                .collect(),
        }
    }
}

impl Installer for ScriptInstaller {
    fn name(&self) -> &str {
        "toolchain"
    }

    fn install(&self, request: &InstallRequest<'_>) -> BenchResult<()> {
        std::fs::create_dir_all(request.install_dir).map_err(|e| BenchError::ToolInstall {
            component: self.name().to_string(),
            reason: format!("failed to create {}: {e}", request.install_dir.display()),
        })?;
        tracing::info!(install_dir = %request.install_dir.display(), "installing toolchain");

        for line in self.command_lines(request) {
            run_install_command(self.name(), &line, request.verbose)?;
        }
        Ok(())
    }
}

/// Runs a fixed command line. An empty command line means there is nothing
/// to install.
pub struct CommandInstaller {
    name: String,
    argv: Vec<String>,
}

impl CommandInstaller {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Self {
        CommandInstaller {
            name: name.into(),
            argv,
        }
    }
}

impl Installer for CommandInstaller {
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, request: &InstallRequest<'_>) -> BenchResult<()> {
        if self.argv.is_empty() {
            tracing::debug!(component = %self.name, "no install command configured");
            return Ok(());
        }
        let line: Vec<OsString> = self.argv.iter().map(OsString::from).collect();
        run_install_command(&self.name, &line, request.verbose)
    }
}

fn run_install_command(component: &str, line: &[OsString], verbose: bool) -> BenchResult<()> {
    let Some((program, args)) = line.split_first() else {
        return Ok(());
    };
    let status = run_logged(Command::new(program).args(args), verbose).map_err(|e| {
        BenchError::ToolInstall {
            component: component.to_string(),
            reason: format!("failed to run {}: {e}", program.to_string_lossy()),
        }
    })?;
    if !status.success() {
        return Err(BenchError::ToolInstall {
            component: component.to_string(),
            reason: format!("installer exited with status: {status}"),
        });
    }
    Ok(())
}

/// Mock installer for testing purposes.
///
/// Counts calls and records the channels it was asked for.
#[derive(Debug)]
pub struct MockInstaller {
    name: String,
    calls: AtomicUsize,
    should_fail: bool,
    requested_channels: Mutex<Vec<Vec<String>>>,
}

impl MockInstaller {
    pub fn new(name: impl Into<String>) -> Self {
        MockInstaller {
            name: name.into(),
            calls: AtomicUsize::new(0),
            should_fail: false,
            requested_channels: Mutex::new(Vec::new()),
        }
    }

    /// Make every install fail.
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.should_fail = fail;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_channels(&self) -> Vec<Vec<String>> {
        self.requested_channels
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Installer for MockInstaller {
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, request: &InstallRequest<'_>) -> BenchResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.requested_channels.lock() {
            log.push(request.channels.iter().map(|c| c.to_string()).collect());
        }
        if self.should_fail {
            return Err(BenchError::ToolInstall {
                component: self.name.clone(),
                reason: "mock install failed".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::framework::{parse_monikers, resolve_channels};

    fn channels(monikers: &[&str]) -> Vec<ToolchainChannel> {
        resolve_channels(&parse_monikers(monikers).unwrap())
    }

    fn lines_as_strings(lines: Vec<Vec<OsString>>) -> Vec<String> {
        lines
            .into_iter()
            .map(|l| {
                l.iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    #[test]
    fn test_script_installer_one_line_per_channel() {
        let installer = ScriptInstaller::new("/tools/dotnet-install.sh");
        let channels = channels(&["net6.0", "net7.0"]);
        let request = InstallRequest {
            architecture: Architecture::X64,
            version: None,
            channels: &channels,
            install_dir: Path::new("/tools/dotnet/x64"),
            verbose: false,
        };
        let lines = lines_as_strings(installer.command_lines(&request));
        let prefix = "/tools/dotnet-install.sh -InstallDir /tools/dotnet/x64 -Architecture x64";
        assert_eq!(
            lines,
            vec![format!("{prefix} -Channel 6.0"), format!("{prefix} -Channel 7.0")]
        );
    }

    #[test]
    fn test_script_installer_pinned_version_single_line() {
        let installer = ScriptInstaller::new("/tools/dotnet-install.sh");
        let channels = channels(&["net6.0", "net7.0"]);
        let request = InstallRequest {
            architecture: Architecture::Arm64,
            version: Some("7.0.100"),
            channels: &channels,
            install_dir: Path::new("/t"),
            verbose: false,
        };
        let lines = lines_as_strings(installer.command_lines(&request));
        assert_eq!(
            lines,
            vec!["/tools/dotnet-install.sh -InstallDir /t -Architecture arm64 -Version 7.0.100"]
        );
    }

    #[test]
    fn test_powershell_script_uses_interpreter() {
        let installer = ScriptInstaller::new("dotnet-install.ps1");
        let channels = channels(&["net8.0"]);
        let request = InstallRequest {
            architecture: Architecture::X86,
            version: None,
            channels: &channels,
            install_dir: Path::new("t"),
            verbose: false,
        };
        let lines = installer.command_lines(&request);
        assert_eq!(lines[0][0], OsString::from("powershell.exe"));
    }

    #[test]
    fn test_toolchain_dir_is_per_architecture() {
        assert_eq!(
            toolchain_dir(Path::new("tools"), Architecture::Arm32),
            PathBuf::from("tools/dotnet/arm32")
        );
    }

    #[test]
    fn test_empty_command_installer_is_noop() {
        let installer = CommandInstaller::new("report tool", Vec::new());
        let request = InstallRequest {
            architecture: Architecture::X64,
            version: None,
            channels: &[],
            install_dir: Path::new("t"),
            verbose: false,
        };
        assert!(installer.install(&request).is_ok());
    }

    #[test]
    fn test_missing_install_program_is_tool_install_error() {
        let installer =
            CommandInstaller::new("report tool", vec!["definitely-not-a-real-binary-4242".into()]);
        let request = InstallRequest {
            architecture: Architecture::X64,
            version: None,
            channels: &[],
            install_dir: Path::new("t"),
            verbose: false,
        };
        let err = installer.install(&request).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ToolInstall { ref component, .. } if component == "report tool"
        ));
    }

    #[test]
    fn test_mock_installer_counts_calls() {
        let mock = MockInstaller::new("toolchain");
        let channels = channels(&["net6.0"]);
        let request = InstallRequest {
            architecture: Architecture::X64,
            version: None,
            channels: &channels,
            install_dir: Path::new("t"),
            verbose: false,
        };
        mock.install(&request).unwrap();
        mock.install(&request).unwrap();
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.requested_channels(), vec![vec!["6.0"], vec!["6.0"]]);
    }
}
