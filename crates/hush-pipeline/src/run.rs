//! One upload-to-result transaction.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use hush_media::{fs_utils::sanitize_file_name, ArtifactTracker, PurgeReport};
use hush_models::{RunId, RunState, Stage, UserId};

use crate::error::{PipelineError, PipelineResult};

/// Scratch paths of a run, named from the run id and the upload's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// The uploaded video as written to disk
    pub source: PathBuf,
    /// Extracted PCM audio
    pub audio: PathBuf,
    /// Enhanced PCM audio
    pub processed: PathBuf,
    /// Re-muxed video
    pub output: PathBuf,
}

impl RunPaths {
    /// Derive the paths for `file_name` under `scratch_dir`.
    ///
    /// `file_name` must already be sanitized.
    pub fn new(scratch_dir: &Path, run_id: &RunId, file_name: &str) -> Self {
        let source = scratch_dir.join(format!("{}_{}", run_id, file_name));
        let stem = source.with_extension("");
        let stem = stem.to_string_lossy();

        let mut audio = PathBuf::from(format!("{}.wav", stem));
        if audio == source {
            audio = PathBuf::from(format!("{}-extracted.wav", stem));
        }

        Self {
            audio,
            processed: PathBuf::from(format!("{}-processed.wav", stem)),
            output: PathBuf::from(format!("{}-output.mp4", stem)),
            source,
        }
    }
}

/// A run's identity, state and temporary files.
///
/// State only moves forward one stage at a time, then to `Done` or `Failed`.
/// The artifact tracker goes with the run: dropping a run that was never
/// purged still removes its files.
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    user_id: UserId,
    state: RunState,
    paths: RunPaths,
    artifacts: ArtifactTracker,
    started: Instant,
}

impl PipelineRun {
    /// Start a run for an upload named `file_name`.
    pub fn new(user_id: UserId, scratch_dir: &Path, file_name: &str) -> PipelineResult<Self> {
        let file_name = sanitize_file_name(file_name)
            .ok_or_else(|| PipelineError::validation("upload has no usable filename"))?;
        let id = RunId::new();
        let paths = RunPaths::new(scratch_dir, &id, &file_name);

        Ok(Self {
            artifacts: ArtifactTracker::new(id.as_str()),
            id,
            user_id,
            state: RunState::default(),
            paths,
            started: Instant::now(),
        })
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Paths registered for cleanup so far.
    pub fn tracked(&self) -> &[PathBuf] {
        self.artifacts.paths()
    }

    /// Register a temporary file for removal when the run ends.
    pub fn track(&mut self, path: impl AsRef<Path>) {
        self.artifacts.track(path);
    }

    /// Move to `to`, which must directly follow the current stage.
    pub fn advance(&mut self, to: Stage) -> PipelineResult<()> {
        match &self.state {
            RunState::Active { stage } if stage.next() == Some(to) => {
                self.state = RunState::Active { stage: to };
                Ok(())
            }
            other => Err(PipelineError::InvalidTransition {
                from: other.as_str().to_string(),
                to,
            }),
        }
    }

    /// Mark the run done. Only valid after the last stage.
    pub fn complete(&mut self) -> PipelineResult<()> {
        match &self.state {
            RunState::Active { stage } if stage.next().is_none() => {
                self.state = RunState::Done;
                Ok(())
            }
            other => Err(PipelineError::InvalidTransition {
                from: other.as_str().to_string(),
                to: Stage::WritingMetadata,
            }),
        }
    }

    /// Mark the run failed in its current stage. A terminal run is left as is.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let RunState::Active { stage } = self.state {
            self.state = RunState::Failed {
                stage,
                reason: reason.into(),
            };
        }
    }

    /// Remove every tracked file.
    pub async fn purge(&mut self) -> PurgeReport {
        self.artifacts.purge_all().await
    }
}
