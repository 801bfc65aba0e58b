//! Pipeline run models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for one upload-to-result pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One discrete step of the pipeline.
///
/// Stages run strictly in declaration order; each stage consumes the
/// previous stage's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input accepted and written to the scratch directory
    Received,
    /// Audio track transcoded to PCM
    Extracting,
    /// Speech enhancement running in its own process
    Enhancing,
    /// Enhanced audio combined with the original picture stream
    Remuxing,
    /// Final container handed to the object store
    Uploading,
    /// Upload record written to the metadata store
    WritingMetadata,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Received,
        Stage::Extracting,
        Stage::Enhancing,
        Stage::Remuxing,
        Stage::Uploading,
        Stage::WritingMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Extracting => "extracting",
            Stage::Enhancing => "enhancing",
            Stage::Remuxing => "remuxing",
            Stage::Uploading => "uploading",
            Stage::WritingMetadata => "writing_metadata",
        }
    }

    /// The stage that follows this one, or `None` for the last stage.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::Extracting),
            Stage::Extracting => Some(Stage::Enhancing),
            Stage::Enhancing => Some(Stage::Remuxing),
            Stage::Remuxing => Some(Stage::Uploading),
            Stage::Uploading => Some(Stage::WritingMetadata),
            Stage::WritingMetadata => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a pipeline run.
///
/// `Done` and `Failed` are absorbing: no transition leaves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Active { stage: Stage },
    Done,
    Failed { stage: Stage, reason: String },
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Active {
            stage: Stage::Received,
        }
    }
}

impl RunState {
    /// Whether the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }

    /// Current (or failing) stage; `None` once done.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunState::Active { stage } | RunState::Failed { stage, .. } => Some(*stage),
            RunState::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Active { stage } => stage.as_str(),
            RunState::Done => "done",
            RunState::Failed { .. } => "failed",
        }
    }
}

/// Captured outcome of one successful external-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_next() {
        for pair in Stage::ALL.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(Stage::WritingMetadata.next(), None);
    }

    #[test]
    fn test_run_state_terminal() {
        assert!(!RunState::default().is_terminal());
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Failed {
            stage: Stage::Extracting,
            reason: "exit 1".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&Stage::WritingMetadata).unwrap();
        assert_eq!(json, "\"writing_metadata\"");

        let state = RunState::Failed {
            stage: Stage::Enhancing,
            reason: "empty output".to_string(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stage"], "enhancing");
    }

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
