//! Pipeline metrics.

use std::time::Duration;

use hush_models::Stage;
use metrics::{counter, gauge, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Finished runs by outcome and final stage.
    pub const RUNS_TOTAL: &str = "pipeline_runs_total";

    /// Runs currently holding a permit.
    pub const RUNS_IN_FLIGHT: &str = "pipeline_runs_in_flight";

    /// Stage duration in seconds by stage and status.
    pub const STAGE_DURATION_SECONDS: &str = "pipeline_stage_duration_seconds";

    /// Temporary files whose deletion failed.
    pub const ARTIFACT_PURGE_FAILURES_TOTAL: &str = "pipeline_artifact_purge_failures_total";

    /// Blobs left behind after a failed metadata write.
    pub const ORPHANED_BLOBS_TOTAL: &str = "pipeline_orphaned_blobs_total";
}

pub fn record_stage(stage: Stage, success: bool, elapsed: Duration) {
    histogram!(
        names::STAGE_DURATION_SECONDS,
        "stage" => stage.as_str(),
        "status" => if success { "ok" } else { "error" }
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_run(outcome: &'static str, stage: Option<Stage>) {
    counter!(
        names::RUNS_TOTAL,
        "outcome" => outcome,
        "stage" => stage.map(|s| s.as_str()).unwrap_or("none")
    )
    .increment(1);
}

/// Counts a run as in flight until dropped.
///
/// A run dropped before [`RunGuard::finish`] is recorded as cancelled.
#[derive(Debug)]
pub struct RunGuard {
    finished: bool,
}

impl RunGuard {
    pub fn start() -> Self {
        gauge!(names::RUNS_IN_FLIGHT).increment(1.0);
        Self { finished: false }
    }

    pub fn finish(mut self, outcome: &'static str, stage: Option<Stage>) {
        record_run(outcome, stage);
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        gauge!(names::RUNS_IN_FLIGHT).decrement(1.0);
        if !self.finished {
            record_run("cancelled", None);
        }
    }
}

pub fn record_purge_failures(count: usize) {
    if count > 0 {
        counter!(names::ARTIFACT_PURGE_FAILURES_TOTAL).increment(count as u64);
    }
}

pub fn record_orphaned_blob() {
    counter!(names::ORPHANED_BLOBS_TOTAL).increment(1);
}
