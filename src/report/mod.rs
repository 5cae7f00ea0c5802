//! Report dispatch.
//!
//! `Reporter` is the seam to the results-upload pipeline. `SubmissionWriter`
//! produces the JSON documents the pipeline consumes; `MockReporter` records
//! calls for tests.

pub mod submission;

use std::sync::Mutex;

use crate::BenchResult;
use crate::core::RunConfiguration;
use crate::engine::provenance::ResolvedSource;
use crate::engine::workflow::RunArtifacts;

// Re-export key types
pub use submission::{
    BuildDocument, Submission, SubmissionMetadata, SubmissionWriter, report_dir,
};

pub trait Reporter: Send + Sync {
    /// Hand the results of every attempted run to the reporting pipeline.
    fn report(
        &self,
        config: &RunConfiguration,
        source: &ResolvedSource,
        artifacts: &RunArtifacts,
    ) -> BenchResult<()>;
}

/// Reporter that only records what it was given.
#[derive(Debug, Default)]
pub struct MockReporter {
    seen: Mutex<Vec<usize>>,
    fail: bool,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Number of framework runs each call saw.
    pub fn runs_seen(&self) -> Vec<usize> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Reporter for MockReporter {
    fn report(
        &self,
        _config: &RunConfiguration,
        _source: &ResolvedSource,
        artifacts: &RunArtifacts,
    ) -> BenchResult<()> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(artifacts.summary.runs.len());
        }
        if self.fail {
            return Err(crate::BenchError::Report("mock reporter failure".into()));
        }
        Ok(())
    }
}
