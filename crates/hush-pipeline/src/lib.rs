//! Pipeline orchestration.
//!
//! A run moves one uploaded video through
//! `Received → Extracting → Enhancing → Remuxing → Uploading → WritingMetadata`
//! and ends in `Done` or `Failed`. Every temporary file a run creates is
//! removed when it ends, whichever way it ends.

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod run;

pub use config::PipelineConfig;
pub use error::{FailureClass, PipelineError, PipelineResult};
pub use gateway::UploadGateway;
pub use logging::RunLogger;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use run::{PipelineRun, RunPaths};
