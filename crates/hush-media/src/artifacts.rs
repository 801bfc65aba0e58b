//! Run-scoped temporary artifact tracking.
//!
//! Paths are registered before the stage that writes them runs, so a file a
//! failed process left half-written is still removed. The tracker owns the
//! cleanup: `purge_all` removes everything explicitly, and dropping a tracker
//! that still holds paths removes them synchronously.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Outcome of a purge. Never an error: every failure is recorded and logged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Files that existed and were deleted
    pub removed: Vec<PathBuf>,
    /// Files that were already gone
    pub absent: Vec<PathBuf>,
    /// Files whose deletion failed, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

impl PurgeReport {
    /// True when nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of paths a deletion was attempted for.
    pub fn attempted(&self) -> usize {
        self.removed.len() + self.absent.len() + self.failed.len()
    }
}

/// Accumulates the temporary files of one pipeline run.
#[derive(Debug)]
pub struct ArtifactTracker {
    owner: String,
    paths: Vec<PathBuf>,
}

impl ArtifactTracker {
    /// Create an empty tracker; `owner` labels log lines (usually the run id).
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            paths: Vec::new(),
        }
    }

    /// Register a path for deletion at the end of the run.
    ///
    /// Returns `false` if the path was already tracked.
    pub fn track(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.paths.iter().any(|p| p == path) {
            return false;
        }
        debug!(owner = %self.owner, path = %path.display(), "Tracking artifact");
        self.paths.push(path.to_path_buf());
        true
    }

    /// Paths currently tracked, in registration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every tracked path once.
    ///
    /// Each deletion is independent; a missing file is not a failure. The
    /// tracker is empty afterwards, so a later purge or drop does nothing.
    /// A path leaves the tracker only once its deletion attempt has finished,
    /// so if this future is dropped midway the rest are removed on drop.
    pub async fn purge_all(&mut self) -> PurgeReport {
        let mut report = PurgeReport::default();

        while let Some(path) = self.paths.first().cloned() {
            let removed = tokio::fs::remove_file(&path).await;
            self.paths.remove(0);
            match removed {
                Ok(()) => {
                    debug!(owner = %self.owner, path = %path.display(), "Cleaned up artifact");
                    report.removed.push(path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => report.absent.push(path),
                Err(e) => {
                    warn!(
                        owner = %self.owner,
                        path = %path.display(),
                        "Failed to clean up artifact: {}", e
                    );
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        report
    }
}

impl Drop for ArtifactTracker {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }

        warn!(
            owner = %self.owner,
            count = self.paths.len(),
            "Artifact tracker dropped before purge, cleaning up"
        );
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    owner = %self.owner,
                    path = %path.display(),
                    "Failed to clean up artifact: {}", e
                ),
            }
        }
    }
}
