//! Submission documents written for the results-upload pipeline.
//!
//! Four JSON files land in `<artifacts>/report/`:
//! - `build.json`: what was benchmarked (source provenance, configuration)
//! - `submission-metadata.json`: who submitted it and under which name
//! - `machinedata.json`: the machine the benchmarks ran on
//! - `submission.json`: everything above plus the per-framework outcomes

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{MachineInfo, ReportOptions, RunConfiguration, SourceKind};
use crate::engine::provenance::ResolvedSource;
use crate::engine::workflow::{FrameworkRun, RunArtifacts};
use crate::{BenchError, BenchResult};

use super::Reporter;

/// Schema version for submission documents
pub const SUBMISSION_SCHEMA_VERSION: u32 = 1;

pub const BUILD_FILE: &str = "build.json";
pub const METADATA_FILE: &str = "submission-metadata.json";
pub const MACHINE_FILE: &str = "machinedata.json";
pub const SUBMISSION_FILE: &str = "submission.json";

/// Directory the submission documents are written to.
pub fn report_dir(artifacts_directory: &Path) -> PathBuf {
    artifacts_directory.join("report")
}

/// Description of the build under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildDocument {
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Commit sha of the product build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_version: Option<String>,
    /// Submission type: rolling, private or local.
    #[serde(rename = "type")]
    pub kind: String,
    pub architecture: String,
    pub configuration: String,
    pub frameworks: Vec<String>,
}

impl BuildDocument {
    pub fn new(
        config: &RunConfiguration,
        options: &ReportOptions,
        source: &ResolvedSource,
    ) -> Self {
        BuildDocument {
            source: source.kind,
            repository: source.repository.clone(),
            branch: source.branch.clone(),
            number: source.commit_sha.clone(),
            source_timestamp: source.source_timestamp.clone(),
            toolchain_version: source
                .toolchain_version
                .clone()
                .or_else(|| config.toolchain_version.clone()),
            kind: options.submission_type.as_str().to_string(),
            architecture: config.architecture.as_str().to_string(),
            configuration: config.build_configuration.as_str().to_string(),
            frameworks: config.frameworks.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stable id derived from the name, commit and timestamp.
    pub cuid: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl SubmissionMetadata {
    pub fn new(options: &ReportOptions, source: &ResolvedSource, timestamp: String) -> Self {
        let seed = format!(
            "{}\n{}\n{}",
            options.submission_name,
            source.commit_sha.as_deref().unwrap_or_default(),
            timestamp
        );
        SubmissionMetadata {
            name: options.submission_name.clone(),
            description: options.description.clone(),
            cuid: crate::sha256_hex(seed.as_bytes())[..32].to_string(),
            timestamp,
        }
    }
}

/// Full submission: the other three documents plus run outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub schema_version: u32,
    pub metadata: SubmissionMetadata,
    pub build: BuildDocument,
    pub machine: MachineInfo,
    pub runs: Vec<FrameworkRun>,
    pub run_log: PathBuf,
    pub bin_directory: PathBuf,
}

/// Writes the submission documents to disk.
#[derive(Debug, Clone, Default)]
pub struct SubmissionWriter {
    machine: Option<MachineInfo>,
}

impl SubmissionWriter {
    /// Writer that detects the machine at report time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with a fixed machine description.
    pub fn with_machine(machine: MachineInfo) -> Self {
        SubmissionWriter {
            machine: Some(machine),
        }
    }

    /// Assemble the submission without touching the filesystem.
    pub fn assemble(
        &self,
        config: &RunConfiguration,
        source: &ResolvedSource,
        artifacts: &RunArtifacts,
    ) -> BenchResult<Submission> {
        let options = config
            .report
            .as_ref()
            .ok_or_else(|| BenchError::Report("reporting was not requested".into()))?;

        Ok(Submission {
            schema_version: SUBMISSION_SCHEMA_VERSION,
            metadata: SubmissionMetadata::new(options, source, crate::now_string()),
            build: BuildDocument::new(config, options, source),
            machine: self.machine.clone().unwrap_or_else(MachineInfo::detect),
            runs: artifacts.summary.runs.clone(),
            run_log: artifacts.run_log.clone(),
            bin_directory: artifacts.bin_directory.clone(),
        })
    }
}

impl Reporter for SubmissionWriter {
    fn report(
        &self,
        config: &RunConfiguration,
        source: &ResolvedSource,
        artifacts: &RunArtifacts,
    ) -> BenchResult<()> {
        let submission = self.assemble(config, source, artifacts)?;
        let dir = report_dir(&artifacts.artifacts_directory);

        crate::write_json(&dir.join(BUILD_FILE), &submission.build)?;
        crate::write_json(&dir.join(METADATA_FILE), &submission.metadata)?;
        crate::write_json(&dir.join(MACHINE_FILE), &submission.machine)?;
        crate::write_json(&dir.join(SUBMISSION_FILE), &submission)?;

        info!(
            dir = %dir.display(),
            name = %submission.metadata.name,
            runs = submission.runs.len(),
            "submission written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FileDefaults, HostRuntime, SubmissionType, parse_and_resolve};
    use crate::engine::workflow::RunSummary;
    use crate::storage::RunStatus;

    fn config(artifacts: &Path, extra: &[&str]) -> RunConfiguration {
        let artifacts = artifacts.to_string_lossy().to_string();
        let mut tokens = vec![
            "microbench-ci",
            "-f",
            "net6.0",
            "net7.0",
            "--artifacts-directory",
            artifacts.as_str(),
            "--generate-report",
            "--submission-name",
            "nightly",
        ];
        tokens.extend_from_slice(extra);
        parse_and_resolve(&HostRuntime::new("linux", None), tokens, &FileDefaults::default())
            .unwrap()
    }

    fn artifacts(config: &RunConfiguration) -> RunArtifacts {
        let summary = RunSummary {
            runs: config
                .frameworks
                .iter()
                .map(|f| FrameworkRun {
                    framework: f.clone(),
                    status: RunStatus::Succeeded,
                    message: None,
                    duration_ms: 5,
                })
                .collect(),
        };
        RunArtifacts {
            bin_directory: config.bin_directory.clone(),
            artifacts_directory: config.artifacts_directory.clone(),
            run_log: config.artifacts_directory.join("runs.jsonl"),
            summary,
        }
    }

    fn source() -> ResolvedSource {
        ResolvedSource {
            kind: SourceKind::Cli,
            branch: Some("main".into()),
            commit_sha: Some("abc123".into()),
            repository: Some("https://example.com/runtime".into()),
            source_timestamp: Some("2024-01-15T10:30:00Z".into()),
            toolchain_version: None,
        }
    }

    #[test]
    fn test_writes_all_documents() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), &["--submission-type", "rolling"]);
        let writer = SubmissionWriter::with_machine(MachineInfo::default());

        writer.report(&cfg, &source(), &artifacts(&cfg)).unwrap();

        let out = report_dir(dir.path());
        for file in [BUILD_FILE, METADATA_FILE, MACHINE_FILE, SUBMISSION_FILE] {
            assert!(out.join(file).exists(), "missing {file}");
        }

        let build: serde_json::Value =
            serde_json::from_slice(&std::fs::read(out.join(BUILD_FILE)).unwrap()).unwrap();
        assert_eq!(build["type"], "rolling");
        assert_eq!(build["number"], "abc123");
        assert_eq!(build["frameworks"], serde_json::json!(["net6.0", "net7.0"]));

        let submission: Submission =
            serde_json::from_slice(&std::fs::read(out.join(SUBMISSION_FILE)).unwrap()).unwrap();
        assert_eq!(submission.metadata.name, "nightly");
        assert_eq!(submission.runs.len(), 2);
    }

    #[test]
    fn test_cuid_depends_on_name_and_commit() {
        let options = ReportOptions {
            submission_name: "a".into(),
            submission_type: SubmissionType::Private,
            description: None,
        };
        let ts = "2024-01-15T10:30:00Z".to_string();
        let first = SubmissionMetadata::new(&options, &source(), ts.clone());
        let again = SubmissionMetadata::new(&options, &source(), ts.clone());
        assert_eq!(first.cuid, again.cuid);
        assert_eq!(first.cuid.len(), 32);

        let renamed = ReportOptions {
            submission_name: "b".into(),
            ..options
        };
        assert_ne!(first.cuid, SubmissionMetadata::new(&renamed, &source(), ts).cuid);
    }

    #[test]
    fn test_assemble_without_report_options_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), &[]);
        cfg.report = None;
        let err = SubmissionWriter::with_machine(MachineInfo::default())
            .assemble(&cfg, &source(), &artifacts(&cfg))
            .unwrap_err();
        assert!(matches!(err, BenchError::Report(_)));
    }
}
