//! Build and run phases.
//!
//! The build covers every moniker with a single call; runs happen once per
//! moniker, strictly one after the other.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::core::{FrameworkMoniker, RunConfiguration, framework::join_monikers};
use crate::storage::{RunLog, RunRecord, RunStatus};
use crate::{BenchError, BenchResult};

use super::project::{BuildRequest, BuildTarget, Project, RunTarget, TARGET_FRAMEWORKS_ENV};

/// Variables the build child process needs to see.
pub fn build_environment(frameworks: &[FrameworkMoniker]) -> Vec<(String, String)> {
    vec![(TARGET_FRAMEWORKS_ENV.to_string(), join_monikers(frameworks))]
}

/// Build the project once for all of `target.frameworks`.
pub fn build_phase(
    project: &dyn Project,
    target: &BuildTarget,
    incremental: bool,
    verbose: bool,
) -> BenchResult<()> {
    let _span = info_span!("build", frameworks = %join_monikers(&target.frameworks)).entered();
    let start = Instant::now();

    let request = BuildRequest {
        target,
        incremental,
        verbose,
        env: build_environment(&target.frameworks),
    };
    project.build(&request).map_err(|e| match e {
        e @ BenchError::BuildFailure(_) => e,
        other => BenchError::BuildFailure(other.to_string()),
    })?;

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "build finished");
    Ok(())
}

/// Outcome of one framework's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkRun {
    pub framework: FrameworkMoniker,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Outcomes of the whole run matrix, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub runs: Vec<FrameworkRun>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &FrameworkRun> {
        self.runs.iter().filter(|r| r.status == RunStatus::Failed)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Where run artifacts live, handed to the reporter.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub bin_directory: PathBuf,
    pub artifacts_directory: PathBuf,
    pub run_log: PathBuf,
    pub summary: RunSummary,
}

/// Run every framework in `config.frameworks` in order.
///
/// Ordinary failures are recorded and the matrix moves on; a fatal failure
/// stops it and is returned.
pub fn run_matrix(
    project: &dyn Project,
    config: &RunConfiguration,
    log: &RunLog,
) -> BenchResult<RunSummary> {
    let mut summary = RunSummary::default();

    for framework in &config.frameworks {
        let _span = info_span!("run", framework = %framework).entered();
        let target = RunTarget {
            project: &config.project,
            bin_directory: &config.bin_directory,
            configuration: config.build_configuration,
            framework,
            config,
        };

        let start = Instant::now();
        let result = project.run(&target);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match &result {
            Ok(()) => {
                info!(duration_ms, "benchmarks finished");
                (RunStatus::Succeeded, None)
            }
            Err(e) if e.is_fatal_run_failure() => {
                debug!("fatal run failure, stopping the matrix");
                (RunStatus::Failed, Some(e.to_string()))
            }
            Err(e) => {
                warn!("{e}; continuing with remaining frameworks");
                (RunStatus::Failed, Some(e.to_string()))
            }
        };

        log.append(&RunRecord::new(framework.clone(), status, message.clone(), duration_ms))?;
        summary.runs.push(FrameworkRun {
            framework: framework.clone(),
            status,
            message,
            duration_ms,
        });

        match result {
            Err(e) if e.is_fatal_run_failure() => return Err(e),
            Err(BenchError::RunFailure { .. }) | Ok(()) => {}
            Err(other) => {
                // Anything that is not a run failure is unexpected here.
                return Err(BenchError::RunFailure {
                    framework: framework.to_string(),
                    message: other.to_string(),
                    fatal: true,
                });
            }
        }
    }

    Ok(summary)
}
