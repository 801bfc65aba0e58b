//! Audio extraction and re-muxing with FFmpeg.

use std::path::Path;

use async_trait::async_trait;
use hush_models::{Stage, StageResult};
use tracing::info;

use crate::command::{FfmpegCommand, StageExecutor};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::unusable_output_reason;

/// PCM layout the extraction stage produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFormat {
    /// FFmpeg audio codec name
    pub codec: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl Default for PcmFormat {
    /// 16-bit little-endian stereo at 44.1 kHz.
    fn default() -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Splits audio out of a container and puts it back.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode the audio track of `video` into a PCM file at `audio`.
    async fn extract_audio(&self, video: &Path, audio: &Path) -> MediaResult<StageResult>;

    /// Combine the picture stream of `video` (stream-copied) with the audio in
    /// `audio` into a new container at `output`.
    async fn remux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<StageResult>;
}

/// Build the extraction command: drop video, transcode audio to `format`.
pub fn extraction_command(video: &Path, audio: &Path, format: &PcmFormat) -> FfmpegCommand {
    FfmpegCommand::new(video, audio)
        .no_video()
        .audio_codec(&format.codec)
        .audio_rate(format.sample_rate)
        .audio_channels(format.channels)
}

/// Build the re-mux command: first video stream of input 0, first audio
/// stream of input 1, video copied without re-encoding.
pub fn remux_command(video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .add_input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .video_codec("copy")
        .shortest()
}

/// `Transcoder` backed by the FFmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    format: PcmFormat,
    executor: StageExecutor,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    /// Create a transcoder using the given FFmpeg binary.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: PcmFormat::default(),
            executor: StageExecutor::new(),
        }
    }

    /// Set the PCM layout for extraction.
    pub fn with_format(mut self, format: PcmFormat) -> Self {
        self.format = format;
        self
    }

    /// Kill FFmpeg if a stage runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    async fn run(&self, stage: Stage, cmd: FfmpegCommand) -> MediaResult<StageResult> {
        let output = cmd.output().to_path_buf();
        let cmd = cmd.program(&self.program).into_stage_command(stage)?;
        let result = self.executor.run(&cmd).await?;

        if let Some(reason) = unusable_output_reason(&output).await? {
            return Err(MediaError::EmptyOutput {
                stage,
                path: output,
                reason,
            });
        }

        Ok(result)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> MediaResult<StageResult> {
        info!(
            "Extracting audio: {} -> {} ({} Hz, {} ch)",
            video.display(),
            audio.display(),
            self.format.sample_rate,
            self.format.channels
        );
        self.run(
            Stage::Extracting,
            extraction_command(video, audio, &self.format),
        )
        .await
    }

    async fn remux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<StageResult> {
        info!(
            "Re-muxing: {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );
        self.run(Stage::Remuxing, remux_command(video, audio, output))
            .await
    }
}
