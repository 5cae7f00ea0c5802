//! Engine module: provisions the toolchain, builds and runs the benchmark
//! project, and dispatches reports.
//!
//! # Architecture
//!
//! - **Installer** (`toolchain`): puts a toolchain or the reporting tool on
//!   disk. `ScriptInstaller` drives the toolchain install script.
//! - **Provisioner** (`provision`): runs the installers at most once per
//!   [`InstallKey`], tracked by an [`InstallStateStore`].
//! - **Project** (`project`): multi-target build and per-framework runs.
//!   `DotnetProject` shells out to the installed toolchain.
//! - **Workflow** (`workflow`): the build phase and the sequential run matrix.
//! - **Controller** (`controller`): the state machine tying it together.
//!
//! # Boundaries
//!
//! - Installers and projects never mutate the orchestrator's own environment;
//!   variables are set on child processes only.
//! - Only the controller decides which phases run for a given mode.

pub mod controller;
pub mod process;
pub mod project;
pub mod provenance;
pub mod provision;
pub mod toolchain;
pub mod workflow;

// Re-export key types for convenience
pub use controller::{OrchestrationError, Orchestrator, Outcome, Phase, State, run_log_path};
pub use project::{DotnetProject, MockProject, Project, ToolchainEnv};
pub use provenance::{FixedProbe, ResolvedSource, SourceProbe, SystemProbe};
pub use provision::{InstallKey, InstallStateStore, MarkerStore, MemoryStore, Provisioner};
pub use toolchain::{CommandInstaller, Installer, MockInstaller, ScriptInstaller};
pub use workflow::{FrameworkRun, RunArtifacts, RunSummary, build_phase, run_matrix};
