//! Structured run logging.

use hush_models::{RunId, Stage, UserId};
use tracing::{error, info, warn, Span};

/// Logs run lifecycle events with the run id, user and operation attached.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    user_id: String,
    operation: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, user_id: &UserId, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            user_id: user_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    /// Log entry into a stage.
    pub fn log_stage(&self, stage: Stage) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage = %stage,
            "Run stage: {}", stage
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, stage: Stage, message: &str) {
        error!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            operation = %self.operation,
            stage = %stage,
            "Run failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span that every event of the run is recorded under.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            user_id = %self.user_id,
            operation = %self.operation
        )
    }
}
