//! The run state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use hush_media::{EnhancementInvoker, Enhancer, FfmpegTranscoder, Transcoder};
use hush_models::{RunId, Stage, UploadRecord, UserId};
use hush_storage::blob_key;
use tokio::sync::Semaphore;
use tracing::{debug, Instrument};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::gateway::UploadGateway;
use crate::logging::RunLogger;
use crate::metrics;
use crate::run::PipelineRun;

const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// A finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub record: UploadRecord,
}

impl RunOutcome {
    pub fn public_url(&self) -> &str {
        &self.record.file_url
    }
}

/// Drives uploads through extraction, enhancement, re-muxing, upload and
/// metadata. Each call to [`Orchestrator::run`] is one independent run.
#[derive(Clone)]
pub struct Orchestrator {
    transcoder: Arc<dyn Transcoder>,
    enhancer: Arc<dyn Enhancer>,
    gateway: UploadGateway,
    scratch_dir: PathBuf,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        enhancer: Arc<dyn Enhancer>,
        gateway: UploadGateway,
        scratch_dir: impl Into<PathBuf>,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            transcoder,
            enhancer,
            gateway,
            scratch_dir: scratch_dir.into(),
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    /// Build with FFmpeg and the configured enhancement engine.
    pub fn from_config(config: &PipelineConfig, gateway: UploadGateway) -> Self {
        let transcoder = FfmpegTranscoder::new(&config.ffmpeg_path)
            .with_format(config.pcm_format())
            .with_timeout(config.stage_timeout);
        let enhancer = EnhancementInvoker::new(&config.enhancer_program)
            .with_args(config.enhancer_args.iter().cloned())
            .with_timeout(config.enhance_timeout)
            .with_settle_delay(config.enhance_settle);

        Self::new(
            Arc::new(transcoder),
            Arc::new(enhancer),
            gateway,
            &config.scratch_dir,
            config.max_concurrent_runs,
        )
    }

    pub fn gateway(&self) -> &UploadGateway {
        &self.gateway
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Runs that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Process one uploaded video for `user_id`.
    ///
    /// Returns exactly once, with the stored record or a stage-tagged error.
    /// The run's temporary files are gone by the time this returns.
    pub async fn run(
        &self,
        user_id: &UserId,
        file_name: &str,
        video: Bytes,
    ) -> PipelineResult<RunOutcome> {
        if video.is_empty() {
            return Err(PipelineError::validation("uploaded video is empty"));
        }
        if file_name.trim().is_empty() {
            return Err(PipelineError::validation("uploaded video has no filename"));
        }
        let mut run = PipelineRun::new(user_id.clone(), &self.scratch_dir, file_name)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PipelineError::Unavailable)?;

        let logger = RunLogger::new(run.id(), user_id, "enhance_video");
        let span = logger.create_span();
        let in_flight = metrics::RunGuard::start();

        async move {
            logger.log_start(file_name);
            let result = self
                .execute(&mut run, video, &logger)
                .await
                .and_then(|record| run.complete().map(|()| record));

            match &result {
                Ok(record) => {
                    in_flight.finish("done", None);
                    logger.log_completion(&record.file_url);
                }
                Err(e) => {
                    let stage = run.state().stage().unwrap_or(e.stage());
                    run.fail(e.to_string());
                    in_flight.finish("failed", Some(stage));
                    match e.stderr() {
                        Some(stderr) if !stderr.trim().is_empty() => {
                            logger.log_error(stage, &format!("{} (stderr: {})", e, stderr.trim()))
                        }
                        _ => logger.log_error(stage, &e.to_string()),
                    }
                }
            }

            // Single cleanup point for every outcome
            let report = run.purge().await;
            metrics::record_purge_failures(report.failed.len());
            if !report.is_clean() {
                logger.log_warning(&format!(
                    "{} of {} temporary files could not be removed",
                    report.failed.len(),
                    report.attempted()
                ));
            }
            debug!(
                removed = report.removed.len(),
                absent = report.absent.len(),
                elapsed_ms = run.elapsed().as_millis() as u64,
                "Run artifacts purged"
            );

            result.map(|record| RunOutcome {
                run_id: run.id().clone(),
                record,
            })
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run: &mut PipelineRun,
        video: Bytes,
        logger: &RunLogger,
    ) -> PipelineResult<UploadRecord> {
        let paths = run.paths().clone();

        // Received
        logger.log_stage(Stage::Received);
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| PipelineError::io(Stage::Received, e))?;
        run.track(&paths.source);
        tokio::fs::write(&paths.source, &video)
            .await
            .map_err(|e| PipelineError::io(Stage::Received, e))?;
        drop(video);

        // Extracting
        run.advance(Stage::Extracting)?;
        logger.log_stage(Stage::Extracting);
        let start = Instant::now();
        run.track(&paths.audio);
        let extracted = self.transcoder.extract_audio(&paths.source, &paths.audio).await;
        metrics::record_stage(Stage::Extracting, extracted.is_ok(), start.elapsed());
        extracted.map_err(|e| PipelineError::media(Stage::Extracting, e))?;

        // Enhancing
        run.advance(Stage::Enhancing)?;
        logger.log_stage(Stage::Enhancing);
        run.track(&paths.processed);
        let start = Instant::now();
        let enhanced = self.enhancer.enhance(&paths.audio, &paths.processed).await;
        metrics::record_stage(Stage::Enhancing, enhanced.is_ok(), start.elapsed());
        enhanced.map_err(|e| PipelineError::media(Stage::Enhancing, e))?;

        // Remuxing
        run.advance(Stage::Remuxing)?;
        logger.log_stage(Stage::Remuxing);
        run.track(&paths.output);
        let start = Instant::now();
        let remuxed = self
            .transcoder
            .remux(&paths.source, &paths.processed, &paths.output)
            .await;
        metrics::record_stage(Stage::Remuxing, remuxed.is_ok(), start.elapsed());
        remuxed.map_err(|e| PipelineError::media(Stage::Remuxing, e))?;

        // Uploading
        run.advance(Stage::Uploading)?;
        logger.log_stage(Stage::Uploading);
        let data = tokio::fs::read(&paths.output)
            .await
            .map_err(|e| PipelineError::io(Stage::Uploading, e))?;
        let key = blob_key(run.user_id());
        let start = Instant::now();
        let stored = self
            .gateway
            .store_blob(&key, Bytes::from(data), OUTPUT_CONTENT_TYPE)
            .await;
        metrics::record_stage(Stage::Uploading, stored.is_ok(), start.elapsed());
        let public_url = stored?;

        // WritingMetadata
        run.advance(Stage::WritingMetadata)?;
        logger.log_stage(Stage::WritingMetadata);
        let start = Instant::now();
        let written = self.gateway.write_metadata(run.user_id(), &public_url).await;
        metrics::record_stage(Stage::WritingMetadata, written.is_ok(), start.elapsed());

        match written {
            Ok(record) => Ok(record),
            Err(e) => {
                self.gateway.discard_blob(&key).await;
                Err(e)
            }
        }
    }
}
