//! Orchestration controller.
//!
//! Drives one invocation through
//! `Init → Validated → Provisioned → Built → Run → Reported → Done`.
//! Run-only skips `Built`; build-only skips `Run` and `Reported`; reporting
//! disabled skips `Reported`. The first error moves to `Failed` and is
//! returned with the phase it happened in.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::BenchError;
use crate::core::{FileDefaults, HostRuntime, RunConfiguration, parse_and_resolve};
use crate::report::Reporter;
use crate::storage::RunLog;

use super::project::{BuildTarget, Project};
use super::provenance::{SourceProbe, resolve_source};
use super::provision::{InstallKey, InstallStateStore, Provisioner};
use super::toolchain::{Installer, toolchain_dir};
use super::workflow::{RunArtifacts, RunSummary, build_phase, run_matrix};

pub const RUN_LOG_FILE: &str = "runs.jsonl";

/// Controller states, in the order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Init,
    Validated,
    Provisioned,
    Built,
    Run,
    Reported,
    Done,
    Failed,
}

/// Unit of work an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Validation,
    Provision,
    Build,
    Run,
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validation => "validation",
            Phase::Provision => "provision",
            Phase::Build => "build",
            Phase::Run => "run",
            Phase::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{phase} phase failed: {source}")]
pub struct OrchestrationError {
    pub phase: Phase,
    #[source]
    pub source: BenchError,
    /// States visited before failing, ending in `Failed`.
    pub visited: Vec<State>,
}

impl OrchestrationError {
    /// Failure before any collaborator ran.
    pub fn validation(source: BenchError) -> Self {
        Progress {
            visited: vec![State::Init],
        }
        .fail(Phase::Validation, source)
    }
}

/// Result of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub visited: Vec<State>,
    /// `None` when no run phase took place.
    pub run_summary: Option<RunSummary>,
}

impl Outcome {
    /// 0 when every attempted run succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match &self.run_summary {
            Some(summary) if !summary.all_succeeded() => 1,
            _ => 0,
        }
    }
}

/// Location of the run log for a configuration.
pub fn run_log_path(artifacts_directory: &Path) -> PathBuf {
    artifacts_directory.join(RUN_LOG_FILE)
}

/// External collaborators the controller drives.
pub struct Orchestrator<'a> {
    pub store: &'a dyn InstallStateStore,
    pub toolchain: &'a dyn Installer,
    pub report_tool: &'a dyn Installer,
    pub project: &'a dyn Project,
    pub reporter: &'a dyn Reporter,
    pub probe: &'a dyn SourceProbe,
}

struct Progress {
    visited: Vec<State>,
}

impl Progress {
    fn enter(&mut self, state: State) {
        info!(?state, "entered state");
        self.visited.push(state);
    }

    fn fail(mut self, phase: Phase, source: BenchError) -> OrchestrationError {
        // The caller prints `source`.
        debug!(%phase, "entering failed state");
        self.visited.push(State::Failed);
        OrchestrationError {
            phase,
            source,
            visited: self.visited,
        }
    }
}

impl<'a> Orchestrator<'a> {
    /// Resolve `tokens` and execute. A resolution error fails before any
    /// collaborator is touched.
    pub fn execute_args<I, T>(
        &self,
        host: &HostRuntime,
        tokens: I,
        defaults: &FileDefaults,
    ) -> Result<Outcome, OrchestrationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match parse_and_resolve(host, tokens, defaults) {
            Ok(config) => self.execute(&config),
            Err(e) => Err(OrchestrationError::validation(e)),
        }
    }

    /// Execute an already validated configuration.
    pub fn execute(&self, config: &RunConfiguration) -> Result<Outcome, OrchestrationError> {
        let mut progress = Progress {
            visited: vec![State::Init],
        };
        progress.enter(State::Validated);

        // Provision
        {
            let _span = info_span!("provision").entered();
            let provisioner = Provisioner::new(
                self.store,
                self.toolchain,
                self.report_tool,
                toolchain_dir(&config.tools_directory, config.architecture),
            );
            let key = InstallKey::from_config(config);
            if let Err(e) = provisioner.ensure_installed(&key, config.verbose) {
                return Err(progress.fail(Phase::Provision, e));
            }
            progress.enter(State::Provisioned);
        }

        if config.mode.builds() {
            let target = BuildTarget::from_config(config);
            if let Err(e) = build_phase(self.project, &target, config.incremental, config.verbose) {
                return Err(progress.fail(Phase::Build, e));
            }
            progress.enter(State::Built);
        }

        let mut run_summary = None;
        if config.mode.runs() {
            let log = RunLog::new(run_log_path(&config.artifacts_directory));
            let summary =
                match log.truncate().and_then(|()| run_matrix(self.project, config, &log)) {
                    Ok(summary) => summary,
                    Err(e) => return Err(progress.fail(Phase::Run, e)),
                };
            progress.enter(State::Run);

            if config.report.is_some() {
                let _span = info_span!("report").entered();
                let artifacts = RunArtifacts {
                    bin_directory: config.bin_directory.clone(),
                    artifacts_directory: config.artifacts_directory.clone(),
                    run_log: log.path().to_path_buf(),
                    summary: summary.clone(),
                };
                let reported = resolve_source(&config.source, self.probe)
                    .and_then(|source| self.reporter.report(config, &source, &artifacts));
                if let Err(e) = reported {
                    return Err(progress.fail(Phase::Report, e));
                }
                progress.enter(State::Reported);
            }
            run_summary = Some(summary);
        }

        progress.enter(State::Done);
        Ok(Outcome {
            visited: progress.visited,
            run_summary,
        })
    }
}
