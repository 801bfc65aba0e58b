//! Error types for media stages.

use std::path::PathBuf;

use hush_models::Stage;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running an external-process stage.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{program} not found in PATH")]
    ProgramNotFound { program: String },

    #[error("Failed to spawn {program} for {stage}: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} process exited with status {}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ProcessFailed {
        stage: Stage,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{stage} process timed out after {secs} seconds")]
    Timeout { stage: Stage, secs: u64 },

    #[error("{stage} produced no usable output at {}: {reason}", .path.display())]
    EmptyOutput {
        stage: Stage,
        path: PathBuf,
        reason: String,
    },

    #[error("Enhancement produced no usable output at {}: {reason}", .path.display())]
    EnhancementFailed { path: PathBuf, reason: String },

    #[error("Path argument is not absolute: {}", .0.display())]
    RelativePath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a process failure error.
    pub fn process_failed(stage: Stage, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            stage,
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create an enhancement failure error.
    pub fn enhancement_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::EnhancementFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The stage the error originated from, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MediaError::Spawn { stage, .. }
            | MediaError::ProcessFailed { stage, .. }
            | MediaError::Timeout { stage, .. }
            | MediaError::EmptyOutput { stage, .. } => Some(*stage),
            MediaError::EnhancementFailed { .. } => Some(Stage::Enhancing),
            MediaError::ProgramNotFound { .. } | MediaError::RelativePath(_) | MediaError::Io(_) => {
                None
            }
        }
    }

    /// Captured standard error of the failed child, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::ProcessFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Exit code of the failed child, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::ProcessFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
