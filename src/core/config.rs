//! Command-line surface and resolution into an immutable [`RunConfiguration`].
//!
//! Resolution is a pure function of the parsed flags and the optional file
//! defaults: it reads nothing from disk and starts no process, so every rule
//! here is covered by plain unit tests.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use super::defaults::FileDefaults;
use super::framework::{FrameworkMoniker, ToolchainChannel, parse_monikers, resolve_channels};
use super::runtime::HostRuntime;
use crate::{BenchError, BenchResult};

pub const DEFAULT_FRAMEWORK: &str = "net8.0";
pub const DEFAULT_PROJECT: &str = "src/benchmarks/micro/MicroBenchmarks.csproj";
pub const DEFAULT_BIN_DIRECTORY: &str = "artifacts/bin";
pub const DEFAULT_ARTIFACTS_DIRECTORY: &str = "artifacts";
pub const DEFAULT_TOOLS_DIRECTORY: &str = "tools";
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    X64,
    X86,
    Arm32,
    Arm64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X64 => "x64",
            Architecture::X86 => "x86",
            Architecture::Arm32 => "arm32",
            Architecture::Arm64 => "arm64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
pub enum BuildConfiguration {
    #[default]
    #[value(name = "Release", alias = "release")]
    Release,
    #[value(name = "Debug", alias = "debug")]
    Debug,
}

impl BuildConfiguration {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfiguration::Release => "Release",
            BuildConfiguration::Debug => "Debug",
        }
    }
}

/// Where report provenance (branch, commit, timestamp) comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// The toolchain installed by the provisioner
    #[default]
    InitTools,
    /// The git checkout the orchestrator runs from
    Repo,
    /// The `--cli-*` flags
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Rolling,
    #[default]
    Private,
    Local,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::Rolling => "rolling",
            SubmissionType::Private => "private",
            SubmissionType::Local => "local",
        }
    }
}

/// Which phases an invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    Full,
    BuildOnly,
    RunOnly,
}

impl BuildMode {
    pub fn builds(&self) -> bool {
        !matches!(self, BuildMode::RunOnly)
    }

    pub fn runs(&self) -> bool {
        !matches!(self, BuildMode::BuildOnly)
    }
}

/// Present only when reporting was requested; the name is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    pub submission_name: String,
    pub submission_type: SubmissionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Options handed through untouched to every benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

/// Fully validated configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub architecture: Architecture,
    pub toolchain_version: Option<String>,
    pub frameworks: Vec<FrameworkMoniker>,
    pub channels: Vec<ToolchainChannel>,
    pub build_configuration: BuildConfiguration,
    pub mode: BuildMode,
    pub report: Option<ReportOptions>,
    pub verbose: bool,
    pub source: SourceInfo,
    pub project: PathBuf,
    pub bin_directory: PathBuf,
    pub artifacts_directory: PathBuf,
    pub tools_directory: PathBuf,
    pub install_script: PathBuf,
    pub report_tool_install: Vec<String>,
    pub incremental: bool,
    pub run_options: RunOptions,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "microbench-ci")]
#[command(
    about = "Provision a toolchain, build and run micro benchmarks across target frameworks",
    long_about = None
)]
pub struct RunArgs {
    /// Architecture of the toolchain binaries to install
    #[arg(long, value_enum)]
    pub architecture: Option<Architecture>,

    /// Toolchain version to install, in the A.B.C format (default: latest per channel)
    #[arg(long, alias = "dotnet-version")]
    pub toolchain_version: Option<String>,

    /// Target framework monikers to build and run (e.g. net6.0,net7.0)
    #[arg(long = "frameworks", short = 'f', num_args = 1.., value_delimiter = ',')]
    pub frameworks: Vec<String>,

    /// Build configuration
    #[arg(long, short = 'c', value_enum)]
    pub configuration: Option<BuildConfiguration>,

    /// Benchmark project file
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Directory the build places binaries in
    #[arg(long)]
    pub bin_directory: Option<PathBuf>,

    /// Directory for run logs and report documents
    #[arg(long)]
    pub artifacts_directory: Option<PathBuf>,

    /// Directory the toolchain is installed into
    #[arg(long)]
    pub tools_directory: Option<PathBuf>,

    /// Toolchain install script (default: <tools>/dotnet-install.sh)
    #[arg(long)]
    pub install_script: Option<PathBuf>,

    /// Command that installs the reporting tool
    #[arg(long)]
    pub report_tool_install: Option<String>,

    /// Keep previous build outputs instead of cleaning the bin directory
    #[arg(long)]
    pub incremental: bool,

    /// Benchmark filter passed to every run
    #[arg(long = "filter", num_args = 1..)]
    pub filters: Vec<String>,

    /// Extra arguments passed to every run (shell quoting applies)
    #[arg(long, allow_hyphen_values = true)]
    pub run_arguments: Option<String>,

    /// Where product information for reports comes from
    #[arg(long, value_enum, default_value_t = SourceKind::InitTools)]
    pub cli_source_info: SourceKind,

    /// Product branch
    #[arg(long)]
    pub cli_branch: Option<String>,

    /// Product commit sha
    #[arg(long)]
    pub cli_commit_sha: Option<String>,

    /// Product repository
    #[arg(long)]
    pub cli_repository: Option<String>,

    /// Timestamp of the product sources ("%Y-%m-%dT%H:%M:%SZ")
    #[arg(long)]
    pub cli_source_timestamp: Option<String>,

    /// Turns off verbosity
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Builds the benchmarks but does not run them
    #[arg(long)]
    pub build_only: bool,

    /// Runs the benchmarks without building them
    #[arg(long)]
    pub run_only: bool,

    /// Generate report documents after the runs
    #[arg(long)]
    pub generate_report: bool,

    /// Submission name (required with --generate-report)
    #[arg(long)]
    pub submission_name: Option<String>,

    /// Submission type
    #[arg(long, value_enum)]
    pub submission_type: Option<SubmissionType>,

    /// Submission description
    #[arg(long)]
    pub submission_description: Option<String>,

    /// Defaults file (default: ./microbench.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Check the host, parse `tokens` (program name first) and resolve them.
pub fn parse_and_resolve<I, T>(
    host: &HostRuntime,
    tokens: I,
    defaults: &FileDefaults,
) -> BenchResult<RunConfiguration>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    host.validate()?;
    let args = RunArgs::try_parse_from(tokens)
        .map_err(|e| BenchError::invalid_argument("arguments", e.to_string().trim().to_string()))?;
    resolve(&args, defaults)
}

/// Validate parsed flags layered over file defaults.
pub fn resolve(args: &RunArgs, defaults: &FileDefaults) -> BenchResult<RunConfiguration> {
    // Typed values
    let architecture = match (args.architecture, defaults.architecture.as_deref()) {
        (Some(arch), _) => arch,
        (None, Some(raw)) => parse_enum::<Architecture>("architecture", raw)?,
        (None, None) => Architecture::default(),
    };
    let build_configuration = match (args.configuration, defaults.configuration.as_deref()) {
        (Some(c), _) => c,
        (None, Some(raw)) => parse_enum::<BuildConfiguration>("configuration", raw)?,
        (None, None) => BuildConfiguration::default(),
    };

    let toolchain_version = args
        .toolchain_version
        .as_deref()
        .or(defaults.toolchain_version.as_deref())
        .map(validate_toolchain_version)
        .transpose()?;

    let requested: Vec<String> = if !args.frameworks.is_empty() {
        args.frameworks.clone()
    } else if let Some(list) = defaults.frameworks.as_ref().filter(|l| !l.is_empty()) {
        list.clone()
    } else {
        vec![DEFAULT_FRAMEWORK.to_string()]
    };
    let frameworks = parse_monikers(&requested)?;

    let timestamp = args
        .cli_source_timestamp
        .as_deref()
        .map(validate_source_timestamp)
        .transpose()?;

    let arguments = match args.run_arguments.as_deref() {
        Some(raw) => split_command_line("--run-arguments", raw)?,
        None => Vec::new(),
    };
    let report_tool_install = match args.report_tool_install.as_deref() {
        Some(raw) => split_command_line("--report-tool-install", raw)?,
        None => Vec::new(),
    };

    let report_defaults = defaults.report.clone().unwrap_or_default();
    let submission_type = match (args.submission_type, report_defaults.submission_type.as_deref()) {
        (Some(t), _) => t,
        (None, Some(raw)) => parse_enum::<SubmissionType>("report.submission_type", raw)?,
        (None, None) => SubmissionType::default(),
    };

    // Cross-field rules
    let mode = match (args.build_only, args.run_only) {
        (true, true) => {
            return Err(BenchError::configuration(
                "--build-only/--run-only",
                "--build-only and --run-only cannot be used together",
            ));
        }
        (true, false) => BuildMode::BuildOnly,
        (false, true) => BuildMode::RunOnly,
        (false, false) => BuildMode::Full,
    };

    let report = if args.generate_report {
        let name = args
            .submission_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                BenchError::configuration(
                    "--submission-name",
                    "--submission-name must be provided to generate report data",
                )
            })?;
        Some(ReportOptions {
            submission_name: name.to_string(),
            submission_type,
            description: args
                .submission_description
                .clone()
                .or(report_defaults.submission_description),
        })
    } else {
        None
    };

    let source = SourceInfo {
        kind: args.cli_source_info,
        branch: args.cli_branch.clone(),
        commit_sha: args.cli_commit_sha.clone(),
        repository: args.cli_repository.clone(),
        timestamp,
    };
    if report.is_some() && source.kind == SourceKind::Cli {
        require_cli_source_fields(&source)?;
    }

    // Derived values
    let channels = resolve_channels(&frameworks);

    let tools_directory = args
        .tools_directory
        .clone()
        .or_else(|| defaults.tools_directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLS_DIRECTORY));
    let install_script = args
        .install_script
        .clone()
        .or_else(|| defaults.install_script.clone())
        .unwrap_or_else(|| tools_directory.join(default_install_script_name()));

    let filters = if !args.filters.is_empty() {
        args.filters.clone()
    } else {
        defaults.filters.clone().unwrap_or_default()
    };

    Ok(RunConfiguration {
        architecture,
        toolchain_version,
        frameworks,
        channels,
        build_configuration,
        mode,
        report,
        verbose: !args.quiet,
        source,
        project: args
            .project
            .clone()
            .or_else(|| defaults.project.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT)),
        bin_directory: args
            .bin_directory
            .clone()
            .or_else(|| defaults.bin_directory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BIN_DIRECTORY)),
        artifacts_directory: args
            .artifacts_directory
            .clone()
            .or_else(|| defaults.artifacts_directory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIRECTORY)),
        tools_directory,
        install_script,
        report_tool_install,
        incremental: args.incremental,
        run_options: RunOptions { filters, arguments },
    })
}

/// Accept exactly `YYYY-MM-DDTHH:MM:SSZ` naming a real instant; echo it back.
pub fn validate_source_timestamp(raw: &str) -> BenchResult<String> {
    use time::PrimitiveDateTime;
    use time::macros::format_description;

    let invalid = || {
        BenchError::invalid_argument(
            "--cli-source-timestamp",
            format!(
                "datetime \"{raw}\" is in the wrong format (expected {SOURCE_TIMESTAMP_FORMAT})"
            ),
        )
    };

    // Shape first: the parser alone tolerates signs and wider years.
    let bytes = raw.as_bytes();
    if bytes.len() != 20 {
        return Err(invalid());
    }
    for (i, b) in bytes.iter().enumerate() {
        let ok = match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return Err(invalid());
        }
    }

    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    PrimitiveDateTime::parse(raw, &format).map_err(|_| invalid())?;
    Ok(raw.to_string())
}

/// Accept versions that begin with `A.B.C` (pre-release suffixes allowed).
pub fn validate_toolchain_version(raw: &str) -> BenchResult<String> {
    let mut parts = raw.splitn(3, '.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().unwrap_or_default();
    let patch = parts.next().unwrap_or_default();
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let patch_lead = patch.bytes().take_while(u8::is_ascii_digit).count();

    if digits(major) && digits(minor) && patch_lead > 0 {
        Ok(raw.to_string())
    } else {
        Err(BenchError::invalid_argument(
            "--toolchain-version",
            format!("version \"{raw}\" is in the wrong format (expected A.B.C)"),
        ))
    }
}

fn require_cli_source_fields(source: &SourceInfo) -> BenchResult<()> {
    let required = [
        ("--cli-branch", source.branch.is_some()),
        ("--cli-commit-sha", source.commit_sha.is_some()),
        ("--cli-repository", source.repository.is_some()),
        ("--cli-source-timestamp", source.timestamp.is_some()),
    ];
    for (flag, present) in required {
        if !present {
            return Err(BenchError::configuration(
                flag,
                format!(
                    "{flag} is required when --cli-source-info is 'cli' and reports are generated"
                ),
            ));
        }
    }
    Ok(())
}

fn split_command_line(field: &str, raw: &str) -> BenchResult<Vec<String>> {
    shlex::split(raw).ok_or_else(|| {
        BenchError::invalid_argument(field, format!("unbalanced quoting in \"{raw}\""))
    })
}

fn parse_enum<T: ValueEnum>(field: &str, raw: &str) -> BenchResult<T> {
    T::from_str(raw, true)
        .map_err(|_| BenchError::invalid_argument(field, format!("unsupported value \"{raw}\"")))
}

fn default_install_script_name() -> &'static str {
    if cfg!(windows) {
        "dotnet-install.ps1"
    } else {
        "dotnet-install.sh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostRuntime {
        HostRuntime::new("linux", Some("6.1.0".into()))
    }

    fn resolve_tokens(tokens: &[&str]) -> BenchResult<RunConfiguration> {
        let mut all = vec!["microbench-ci"];
        all.extend_from_slice(tokens);
        parse_and_resolve(&host(), all, &FileDefaults::default())
    }

    #[test]
    fn test_defaults() {
        let cfg = resolve_tokens(&[]).unwrap();
        assert_eq!(cfg.architecture, Architecture::X64);
        assert_eq!(cfg.build_configuration, BuildConfiguration::Release);
        assert_eq!(cfg.mode, BuildMode::Full);
        assert_eq!(cfg.frameworks.len(), 1);
        assert_eq!(cfg.frameworks[0].to_string(), DEFAULT_FRAMEWORK);
        assert_eq!(cfg.channels[0].as_str(), "8.0");
        assert!(cfg.verbose);
        assert!(cfg.report.is_none());
        assert_eq!(cfg.source.kind, SourceKind::InitTools);
        assert!(cfg.install_script.starts_with(DEFAULT_TOOLS_DIRECTORY));
    }

    #[test]
    fn test_frameworks_accept_commas_and_repeats() {
        let cfg =
            resolve_tokens(&["--frameworks", "net6.0,net7.0", "-f", "net6.0", "netcoreapp3.1"])
                .unwrap();
        let names: Vec<_> = cfg.frameworks.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["net6.0", "net7.0", "netcoreapp3.1"]);
        let channels: Vec<_> = cfg.channels.iter().map(|c| c.to_string()).collect();
        assert_eq!(channels, vec!["6.0", "7.0", "3.1"]);
    }

    #[test]
    fn test_report_requires_submission_name() {
        let err = resolve_tokens(&["--generate-report"]).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Configuration { ref field, .. } if field == "--submission-name"
        ));

        let err = resolve_tokens(&["--generate-report", "--submission-name", "  "]).unwrap_err();
        assert!(matches!(err, BenchError::Configuration { .. }));
    }

    #[test]
    fn test_report_options_resolved() {
        let cfg = resolve_tokens(&[
            "--generate-report",
            "--submission-name",
            "nightly",
            "--submission-type",
            "rolling",
        ])
        .unwrap();
        let report = cfg.report.unwrap();
        assert_eq!(report.submission_name, "nightly");
        assert_eq!(report.submission_type, SubmissionType::Rolling);
    }

    #[test]
    fn test_build_only_and_run_only_are_exclusive() {
        let err = resolve_tokens(&["--build-only", "--run-only"]).unwrap_err();
        assert!(matches!(err, BenchError::Configuration { .. }));
        assert_eq!(resolve_tokens(&["--build-only"]).unwrap().mode, BuildMode::BuildOnly);
        assert_eq!(resolve_tokens(&["--run-only"]).unwrap().mode, BuildMode::RunOnly);
    }

    #[test]
    fn test_quiet_turns_off_verbosity() {
        assert!(!resolve_tokens(&["-q"]).unwrap().verbose);
    }

    #[test]
    fn test_well_formed_timestamps_echo_unchanged() {
        for ts in ["2019-01-31T23:59:59Z", "2020-02-29T00:00:00Z", "1999-12-31T12:30:45Z"] {
            let cfg = resolve_tokens(&["--cli-source-timestamp", ts]).unwrap();
            assert_eq!(cfg.source.timestamp.as_deref(), Some(ts));
        }
    }

    #[test]
    fn test_malformed_timestamps_are_invalid_arguments() {
        for ts in [
            "2019-01-31 23:59:59Z",
            "2019-01-31T23:59:59",
            "2019-01-31T23:59:59+00:00",
            "2019-1-31T23:59:59Z",
            "2019-02-30T00:00:00Z",
            "2019-01-31T24:00:00Z",
            "+2019-01-31T23:59:5Z",
            "2019-01-31T23:59:59z",
            "",
            "yesterday",
        ] {
            let err = validate_source_timestamp(ts).unwrap_err();
            match err {
                BenchError::InvalidArgument { field, message } => {
                    assert_eq!(field, "--cli-source-timestamp");
                    assert!(message.contains(SOURCE_TIMESTAMP_FORMAT), "{message}");
                }
                other => panic!("{ts}: unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_toolchain_version_format() {
        assert!(validate_toolchain_version("6.0.100").is_ok());
        assert!(validate_toolchain_version("8.0.100-preview.1.23115.2").is_ok());
        for bad in ["6.0", "latest", "6.x.1", ".0.1", "6.0.x"] {
            assert!(
                matches!(validate_toolchain_version(bad), Err(BenchError::InvalidArgument { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_framework_names_the_flag() {
        let err = resolve_tokens(&["--frameworks", "net461"]).unwrap_err();
        assert!(err.to_string().contains("--frameworks"));
    }

    #[test]
    fn test_cli_source_requires_all_fields_when_reporting() {
        let err = resolve_tokens(&[
            "--generate-report",
            "--submission-name",
            "x",
            "--cli-source-info",
            "cli",
            "--cli-branch",
            "main",
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            BenchError::Configuration { ref field, .. } if field == "--cli-commit-sha"
        ));

        // Without reporting the provenance is unused and may be partial.
        assert!(resolve_tokens(&["--cli-source-info", "cli"]).is_ok());
    }

    #[test]
    fn test_run_arguments_are_shell_split() {
        let cfg = resolve_tokens(&[
            "--run-arguments",
            "--iterationCount 5 --join \"a b\"",
            "--filter",
            "*Json*",
            "*Xml*",
        ])
        .unwrap();
        assert_eq!(cfg.run_options.arguments, vec!["--iterationCount", "5", "--join", "a b"]);
        assert_eq!(cfg.run_options.filters, vec!["*Json*", "*Xml*"]);

        let err = resolve_tokens(&["--run-arguments", "\"unterminated"]).unwrap_err();
        assert!(matches!(
            err,
            BenchError::InvalidArgument { ref field, .. } if field == "--run-arguments"
        ));
    }

    #[test]
    fn test_file_defaults_sit_under_flags() {
        let defaults = FileDefaults {
            architecture: Some("arm64".into()),
            frameworks: Some(vec!["net6.0".into()]),
            configuration: Some("debug".into()),
            ..Default::default()
        };
        let args = RunArgs::try_parse_from(["microbench-ci"]).unwrap();
        let cfg = resolve(&args, &defaults).unwrap();
        assert_eq!(cfg.architecture, Architecture::Arm64);
        assert_eq!(cfg.build_configuration, BuildConfiguration::Debug);
        assert_eq!(cfg.frameworks[0].to_string(), "net6.0");

        let args =
            RunArgs::try_parse_from(["microbench-ci", "--architecture", "x86", "-f", "net7.0"])
                .unwrap();
        let cfg = resolve(&args, &defaults).unwrap();
        assert_eq!(cfg.architecture, Architecture::X86);
        assert_eq!(cfg.frameworks[0].to_string(), "net7.0");
    }

    #[test]
    fn test_bad_file_default_names_the_key() {
        let defaults = FileDefaults {
            architecture: Some("sparc".into()),
            ..Default::default()
        };
        let args = RunArgs::default();
        let err = resolve(&args, &defaults).unwrap_err();
        assert!(matches!(
            err,
            BenchError::InvalidArgument { ref field, .. } if field == "architecture"
        ));
    }

    #[test]
    fn test_unsupported_host_fails_before_parsing() {
        let host = HostRuntime::new("plan9", None);
        // The tokens are garbage; the runtime check must win.
        let err =
            parse_and_resolve(&host, ["microbench-ci", "--no-such-flag"], &FileDefaults::default())
                .unwrap_err();
        assert!(matches!(err, BenchError::UnsupportedRuntime(_)));
    }

    #[test]
    fn test_unknown_flag_is_an_invalid_argument() {
        let err = resolve_tokens(&["--no-such-flag"]).unwrap_err();
        assert!(matches!(err, BenchError::InvalidArgument { .. }));
    }
}
