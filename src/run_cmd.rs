//! The `microbench-ci` command: wires the real collaborators into the
//! controller and maps the outcome to an exit status.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};

use crate::core::{FileDefaults, HostRuntime, RunArgs, RunConfiguration, resolve};
use crate::engine::provenance::default_repo_dir;
use crate::engine::toolchain::toolchain_dir;
use crate::engine::{
    CommandInstaller, DotnetProject, MarkerStore, OrchestrationError, Orchestrator, ScriptInstaller,
    SystemProbe, ToolchainEnv,
};
use crate::report::SubmissionWriter;
use crate::{BenchError, absolutize};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Result of reading the command line on a supported host.
#[derive(Debug)]
pub enum Startup {
    Ready(RunArgs),
    /// clap usage error, help or version output.
    Usage(clap::Error),
}

/// Check the host, then parse the command line.
///
/// An unsupported host is reported even when the flags are malformed.
pub fn startup<I, T>(host: &HostRuntime, tokens: I) -> Result<Startup, OrchestrationError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    host.validate().map_err(OrchestrationError::validation)?;
    Ok(match RunArgs::try_parse_from(tokens) {
        Ok(args) => Startup::Ready(args),
        Err(e) => Startup::Usage(e),
    })
}

/// Resolve flags layered over the defaults file.
pub fn load_configuration(
    args: &RunArgs,
    cwd: &Path,
) -> Result<RunConfiguration, OrchestrationError> {
    let defaults = FileDefaults::discover(args.config.as_deref(), cwd)
        .map_err(OrchestrationError::validation)?;
    resolve(args, &defaults).map_err(OrchestrationError::validation)
}

/// Run one invocation. Returns the process exit status on completion.
pub fn run(args: RunArgs) -> Result<i32, OrchestrationError> {
    let cwd = std::env::current_dir().map_err(|e| {
        OrchestrationError::validation(BenchError::io("failed to read working directory", e))
    })?;
    let config = load_configuration(&args, &cwd)?;
    execute(&config, &cwd)
}

/// Execute a resolved configuration against the real toolchain.
pub fn execute(config: &RunConfiguration, cwd: &Path) -> Result<i32, OrchestrationError> {
    let install_dir: PathBuf =
        absolutize(cwd, &toolchain_dir(&config.tools_directory, config.architecture));
    let toolchain_env = ToolchainEnv::new(&install_dir);

    let store = MarkerStore::new(absolutize(cwd, &config.tools_directory));
    let toolchain = ScriptInstaller::new(absolutize(cwd, &config.install_script));
    let report_tool = CommandInstaller::new("report tool", config.report_tool_install.clone());
    let project = DotnetProject::new(toolchain_env.clone(), cwd);
    let reporter = SubmissionWriter::new();
    let probe =
        SystemProbe::new(absolutize(cwd, &default_repo_dir(&config.project)), toolchain_env);

    let orchestrator = Orchestrator {
        store: &store,
        toolchain: &toolchain,
        report_tool: &report_tool,
        project: &project,
        reporter: &reporter,
        probe: &probe,
    };

    let outcome = orchestrator.execute(config)?;
    if let Some(summary) = &outcome.run_summary {
        let failed: Vec<String> = summary.failed().map(|r| r.framework.to_string()).collect();
        if failed.is_empty() {
            info!(runs = summary.runs.len(), "all benchmark runs succeeded");
        } else {
            warn!(failed = %failed.join(","), "some benchmark runs failed");
        }
    }
    Ok(outcome.exit_code())
}
