//! Source provenance for report submissions.
//!
//! `--cli-source-info` picks where branch, commit and timestamp come from:
//! the installed toolchain (`init-tools`), the git checkout (`repo`), or the
//! `--cli-*` flags (`cli`).

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use tracing::debug;

use crate::core::{SourceInfo, SourceKind};
use crate::{BenchError, BenchResult};

use super::project::ToolchainEnv;

/// Provenance as written into `build.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
    /// Toolchain version, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_version: Option<String>,
}

/// Where non-CLI provenance is looked up.
pub trait SourceProbe: Send + Sync {
    /// Provenance of the git checkout.
    fn repo(&self) -> BenchResult<ResolvedSource>;

    /// Provenance of the installed toolchain.
    fn toolchain(&self) -> BenchResult<ResolvedSource>;
}

/// Resolve provenance for the configured source kind.
pub fn resolve_source(source: &SourceInfo, probe: &dyn SourceProbe) -> BenchResult<ResolvedSource> {
    let resolved = match source.kind {
        SourceKind::Cli => ResolvedSource {
            kind: SourceKind::Cli,
            branch: source.branch.clone(),
            commit_sha: source.commit_sha.clone(),
            repository: source.repository.clone(),
            source_timestamp: source.timestamp.clone(),
            toolchain_version: None,
        },
        SourceKind::Repo => probe.repo()?,
        SourceKind::InitTools => probe.toolchain()?,
    };
    debug!(?resolved, "resolved source provenance");
    Ok(resolved)
}

/// Probe that shells out to `git` and the installed toolchain.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    repo_dir: PathBuf,
    toolchain: ToolchainEnv,
}

impl SystemProbe {
    pub fn new(repo_dir: impl Into<PathBuf>, toolchain: ToolchainEnv) -> Self {
        SystemProbe {
            repo_dir: repo_dir.into(),
            toolchain,
        }
    }

    fn git(&self, args: &[&str]) -> BenchResult<String> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.repo_dir);
        capture(&mut cmd).ok_or_else(|| {
            BenchError::Report(format!(
                "`git {}` failed in {}",
                args.join(" "),
                self.repo_dir.display()
            ))
        })
    }
}

impl SourceProbe for SystemProbe {
    fn repo(&self) -> BenchResult<ResolvedSource> {
        let commit_seconds = self.git(&["log", "-1", "--format=%ct"])?;
        let seconds: i64 = commit_seconds.parse().map_err(|_| {
            BenchError::Report(format!("unexpected commit time from git: {commit_seconds}"))
        })?;

        Ok(ResolvedSource {
            kind: SourceKind::Repo,
            branch: Some(self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?),
            commit_sha: Some(self.git(&["rev-parse", "HEAD"])?),
            // A checkout without an origin remote is still a valid source.
            repository: self.git(&["config", "--get", "remote.origin.url"]).ok(),
            source_timestamp: Some(format_source_timestamp(seconds)?),
            toolchain_version: None,
        })
    }

    fn toolchain(&self) -> BenchResult<ResolvedSource> {
        let mut cmd = Command::new(self.toolchain.executable());
        cmd.arg("--info");
        self.toolchain.apply(&mut cmd);
        let output = capture(&mut cmd).ok_or_else(|| {
            BenchError::Report(format!(
                "`{} --info` failed",
                self.toolchain.executable().display()
            ))
        })?;

        let info = parse_toolchain_info(&output);
        Ok(ResolvedSource {
            kind: SourceKind::InitTools,
            branch: None,
            commit_sha: info.commit,
            repository: None,
            source_timestamp: None,
            toolchain_version: info.version,
        })
    }
}

/// Probe returning fixed answers.
#[derive(Debug, Clone, Default)]
pub struct FixedProbe {
    pub repo: ResolvedSource,
    pub toolchain: ResolvedSource,
}

impl SourceProbe for FixedProbe {
    fn repo(&self) -> BenchResult<ResolvedSource> {
        Ok(self.repo.clone())
    }

    fn toolchain(&self) -> BenchResult<ResolvedSource> {
        Ok(self.toolchain.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainInfo {
    pub version: Option<String>,
    pub commit: Option<String>,
}

/// Parse the first `Version:` and `Commit:` entries of `--info` output.
///
/// Example input:
/// ```text
/// .NET SDK:
///  Version:           8.0.100
///  Commit:            57efcf1350
/// ```
pub fn parse_toolchain_info(output: &str) -> ToolchainInfo {
    let mut info = ToolchainInfo::default();
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Version" if info.version.is_none() => info.version = Some(value.to_string()),
            "Commit" if info.commit.is_none() => info.commit = Some(value.to_string()),
            _ => {}
        }
        if info.version.is_some() && info.commit.is_some() {
            break;
        }
    }
    info
}

/// Format a unix timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_source_timestamp(unix_seconds: i64) -> BenchResult<String> {
    let instant = time::OffsetDateTime::from_unix_timestamp(unix_seconds)
        .map_err(|e| BenchError::Report(format!("invalid commit time {unix_seconds}: {e}")))?;
    instant
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
        .map_err(|e| BenchError::Report(format!("failed to format commit time: {e}")))
}

/// Run a command and capture trimmed stdout; `None` unless it succeeded.
fn capture(cmd: &mut Command) -> Option<String> {
    cmd.output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Working directory used for `repo` provenance.
pub fn default_repo_dir(project: &Path) -> PathBuf {
    project
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
