//! Pipeline error types.

use hush_media::MediaError;
use hush_metadata::MetadataError;
use hush_models::Stage;
use hush_storage::StorageError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why a run failed. Every variant is terminal for the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    Validation(String),

    /// An external tool failed, timed out, could not start, or wrote nothing.
    #[error("{stage} failed: {source}")]
    Process {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    /// The enhancer exited cleanly but its output is missing or empty.
    #[error("Enhancement failed: {0}")]
    Enhancement(#[source] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("IO error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: Stage },

    #[error("Pipeline is shutting down")]
    Unavailable,
}

/// Coarse outcome a caller may branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    BadInput,
    ProcessingFailed,
    StorageFailed,
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(stage: Stage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// Tag a media error with the stage that produced it.
    pub fn media(stage: Stage, err: MediaError) -> Self {
        match err {
            MediaError::EnhancementFailed { .. } => Self::Enhancement(err),
            other => Self::Process {
                stage: other.stage().unwrap_or(stage),
                source: other,
            },
        }
    }

    /// The stage the run was in when this error ended it.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) | Self::Unavailable => Stage::Received,
            Self::Process { stage, .. } | Self::Io { stage, .. } => *stage,
            Self::Enhancement(_) => Stage::Enhancing,
            Self::Storage(_) => Stage::Uploading,
            Self::Metadata(_) => Stage::WritingMetadata,
            Self::InvalidTransition { to, .. } => *to,
        }
    }

    pub fn outcome(&self) -> FailureClass {
        match self {
            Self::Validation(_) => FailureClass::BadInput,
            Self::Storage(_) | Self::Metadata(_) => FailureClass::StorageFailed,
            Self::Process { .. }
            | Self::Enhancement(_)
            | Self::Io { .. }
            | Self::InvalidTransition { .. }
            | Self::Unavailable => FailureClass::ProcessingFailed,
        }
    }

    /// Captured stderr of the failing tool, for operators.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Process { source, .. } => source.stderr(),
            _ => None,
        }
    }
}
