//! Core types: framework monikers, host checks and the resolved run configuration.

pub mod config;
pub mod defaults;
pub mod env;
pub mod framework;
pub mod runtime;

// Re-export key types for convenience
pub use config::{
    Architecture, BuildConfiguration, BuildMode, ReportOptions, RunArgs, RunConfiguration,
    RunOptions, SourceInfo, SourceKind, SubmissionType, parse_and_resolve, resolve,
};
pub use defaults::FileDefaults;
pub use env::MachineInfo;
pub use framework::{FrameworkMoniker, ToolchainChannel};
pub use runtime::HostRuntime;
