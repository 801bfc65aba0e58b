//! Shared data models for the Hush pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Run identifiers, stages and the run state machine
//! - Captured results of external-process stages
//! - Persisted upload records

pub mod run;
pub mod upload;

// Re-export common types
pub use run::{RunId, RunState, Stage, StageResult};
pub use upload::{UploadRecord, UserId};
