//! Storage layer for run records.

pub mod jsonl;

// Re-export key types
pub use jsonl::{RunLog, RunRecord, RunStatus};
