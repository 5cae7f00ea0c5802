//! Benchmark project abstraction: build once for all monikers, run per moniker.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use crate::core::{BuildConfiguration, FrameworkMoniker, RunConfiguration};
use crate::{BenchError, BenchResult};

use super::process::run_logged;

/// Environment variable the project file reads its target frameworks from.
pub const TARGET_FRAMEWORKS_ENV: &str = "BENCHMARK_TARGET_FRAMEWORKS";

/// One multi-targeting build.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub project: PathBuf,
    pub bin_directory: PathBuf,
    pub configuration: BuildConfiguration,
    pub frameworks: Vec<FrameworkMoniker>,
}

impl BuildTarget {
    pub fn from_config(config: &RunConfiguration) -> Self {
        BuildTarget {
            project: config.project.clone(),
            bin_directory: config.bin_directory.clone(),
            configuration: config.build_configuration,
            frameworks: config.frameworks.clone(),
        }
    }
}

/// A build call as handed to the project.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub target: &'a BuildTarget,
    pub incremental: bool,
    pub verbose: bool,
    /// Variables the build's child process must see.
    pub env: Vec<(String, String)>,
}

/// One benchmark run for a single moniker.
#[derive(Debug, Clone)]
pub struct RunTarget<'a> {
    pub project: &'a Path,
    pub bin_directory: &'a Path,
    pub configuration: BuildConfiguration,
    pub framework: &'a FrameworkMoniker,
    pub config: &'a RunConfiguration,
}

/// Trait for benchmark project build/run mechanics.
pub trait Project: Send + Sync {
    /// Build every framework in `request.target` with a single invocation.
    fn build(&self, request: &BuildRequest<'_>) -> BenchResult<()>;

    /// Run the benchmarks for one framework.
    ///
    /// Returns `RunFailure` on failure; `fatal` is set when the benchmark
    /// process could not be started at all.
    fn run(&self, target: &RunTarget<'_>) -> BenchResult<()>;
}

/// Environment applied to every toolchain child process.
#[derive(Debug, Clone)]
pub struct ToolchainEnv {
    install_dir: PathBuf,
}

impl ToolchainEnv {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        ToolchainEnv {
            install_dir: install_dir.into(),
        }
    }

    pub fn vars(&self) -> Vec<(String, OsString)> {
        let mut paths = vec![self.install_dir.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        let path = std::env::join_paths(paths)
            .unwrap_or_else(|_| self.install_dir.clone().into_os_string());

        vec![
            ("DOTNET_CLI_TELEMETRY_OPTOUT".into(), "1".into()),
            ("DOTNET_MULTILEVEL_LOOKUP".into(), "0".into()),
            ("UseSharedCompilation".into(), "false".into()),
            ("DOTNET_ROOT".into(), self.install_dir.clone().into_os_string()),
            ("PATH".into(), path),
        ]
    }

    pub fn apply(&self, cmd: &mut Command) {
        for (key, value) in self.vars() {
            cmd.env(key, value);
        }
    }

    /// The `dotnet` executable inside the install directory.
    pub fn executable(&self) -> PathBuf {
        self.install_dir.join(if cfg!(windows) { "dotnet.exe" } else { "dotnet" })
    }
}

/// Project driven through the toolchain CLI.
pub struct DotnetProject {
    toolchain: ToolchainEnv,
    working_dir: PathBuf,
}

impl DotnetProject {
    pub fn new(toolchain: ToolchainEnv, working_dir: impl Into<PathBuf>) -> Self {
        DotnetProject {
            toolchain,
            working_dir: working_dir.into(),
        }
    }

    fn program(&self) -> PathBuf {
        let exe = self.toolchain.executable();
        if exe.is_file() { exe } else { PathBuf::from("dotnet") }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program());
        cmd.current_dir(&self.working_dir);
        self.toolchain.apply(&mut cmd);
        cmd
    }

    /// Arguments of the build invocation.
    pub fn build_args(target: &BuildTarget) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "build".into(),
            target.project.clone().into_os_string(),
            "--configuration".into(),
            target.configuration.as_str().into(),
            "--no-restore".into(),
        ];
        args.push(base_output_property(&target.bin_directory));
        args
    }

    /// Arguments of the run invocation for one framework.
    pub fn run_args(target: &RunTarget<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "run".into(),
            "--project".into(),
            target.project.as_os_str().to_owned(),
            "--configuration".into(),
            target.configuration.as_str().into(),
            "--framework".into(),
            target.framework.as_string().into(),
            "--no-restore".into(),
            "--no-build".into(),
        ];
        args.push(base_output_property(target.bin_directory));

        let options = &target.config.run_options;
        if !options.filters.is_empty() || !options.arguments.is_empty() {
            args.push("--".into());
        }
        if !options.filters.is_empty() {
            args.push("--filter".into());
            args.extend(options.filters.iter().map(OsString::from));
        }
        args.extend(options.arguments.iter().map(OsString::from));
        args
    }
}

fn base_output_property(bin_directory: &Path) -> OsString {
    let mut prop = OsString::from("-p:BaseOutputPath=");
    prop.push(bin_directory.as_os_str());
    prop.push(std::path::MAIN_SEPARATOR_STR);
    prop
}

impl Project for DotnetProject {
    fn build(&self, request: &BuildRequest<'_>) -> BenchResult<()> {
        let target = request.target;
        if !request.incremental && target.bin_directory.exists() {
            tracing::info!(
                bin = %target.bin_directory.display(),
                "removing previous build outputs"
            );
            std::fs::remove_dir_all(&target.bin_directory).map_err(|e| {
                BenchError::BuildFailure(format!(
                    "failed to clean {}: {e}",
                    target.bin_directory.display()
                ))
            })?;
        }

        let mut restore = self.command();
        restore.arg("restore").arg(&target.project);
        restore.envs(request.env.iter().map(|(k, v)| (k, v)));
        let status = run_logged(&mut restore, request.verbose)
            .map_err(|e| BenchError::BuildFailure(format!("failed to run restore: {e}")))?;
        if !status.success() {
            return Err(BenchError::BuildFailure(format!(
                "restore failed with status: {status}"
            )));
        }

        let mut build = self.command();
        build.args(Self::build_args(target));
        build.envs(request.env.iter().map(|(k, v)| (k, v)));
        let status = run_logged(&mut build, request.verbose)
            .map_err(|e| BenchError::BuildFailure(format!("failed to run build: {e}")))?;
        if !status.success() {
            return Err(BenchError::BuildFailure(format!(
                "build failed with status: {status}"
            )));
        }
        Ok(())
    }

    fn run(&self, target: &RunTarget<'_>) -> BenchResult<()> {
        let mut cmd = self.command();
        cmd.args(Self::run_args(target));
        let framework = target.framework.to_string();
        let status =
            run_logged(&mut cmd, target.config.verbose).map_err(|e| BenchError::RunFailure {
                framework: framework.clone(),
                message: format!("failed to start benchmarks: {e}"),
                fatal: true,
            })?;
        if !status.success() {
            return Err(BenchError::RunFailure {
                framework,
                message: format!("benchmarks exited with status: {status}"),
                fatal: false,
            });
        }
        Ok(())
    }
}

/// A call observed by [`MockProject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCall {
    Build {
        frameworks: Vec<String>,
        incremental: bool,
        env: Vec<(String, String)>,
    },
    Run {
        framework: String,
        filters: Vec<String>,
    },
}

/// Mock project for testing purposes.
#[derive(Debug, Default)]
pub struct MockProject {
    calls: Mutex<Vec<ProjectCall>>,
    build_fails: bool,
    run_failures: Vec<(String, bool)>,
}

impl MockProject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the build fail.
    pub fn build_fails(mut self) -> Self {
        self.build_fails = true;
        self
    }

    /// Make the run for `framework` fail; `fatal` marks it unrecoverable.
    pub fn run_fails(mut self, framework: impl Into<String>, fatal: bool) -> Self {
        self.run_failures.push((framework.into(), fatal));
        self
    }

    pub fn calls(&self) -> Vec<ProjectCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn build_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProjectCall::Build { .. }))
            .count()
    }

    /// Frameworks run so far, in call order.
    pub fn run_frameworks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProjectCall::Run { framework, .. } => Some(framework),
                ProjectCall::Build { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: ProjectCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Project for MockProject {
    fn build(&self, request: &BuildRequest<'_>) -> BenchResult<()> {
        self.record(ProjectCall::Build {
            frameworks: request.target.frameworks.iter().map(|f| f.to_string()).collect(),
            incremental: request.incremental,
            env: request.env.clone(),
        });
        if self.build_fails {
            return Err(BenchError::BuildFailure("mock build failed".into()));
        }
        Ok(())
    }

    fn run(&self, target: &RunTarget<'_>) -> BenchResult<()> {
        let framework = target.framework.to_string();
        self.record(ProjectCall::Run {
            framework: framework.clone(),
            filters: target.config.run_options.filters.clone(),
        });
        if let Some((_, fatal)) = self.run_failures.iter().find(|(f, _)| *f == framework) {
            return Err(BenchError::RunFailure {
                framework,
                message: "mock run failed".into(),
                fatal: *fatal,
            });
        }
        Ok(())
    }
}
