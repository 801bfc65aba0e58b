//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use hush_media::PcmFormat;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the temporary files of in-flight runs
    pub scratch_dir: PathBuf,
    /// FFmpeg binary
    pub ffmpeg_path: String,
    /// Enhancement engine program
    pub enhancer_program: String,
    /// Arguments placed before the engine's input and output paths
    pub enhancer_args: Vec<String>,
    /// Timeout for each FFmpeg stage
    pub stage_timeout: Duration,
    /// Timeout for the enhancement stage
    pub enhance_timeout: Duration,
    /// Pause after the engine exits before its output is checked
    pub enhance_settle: Duration,
    /// Maximum runs executing at once
    pub max_concurrent_runs: usize,
    /// Extraction sample rate in Hz
    pub sample_rate: u32,
    /// Extraction channel count
    pub channels: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/tmp/hush"),
            ffmpeg_path: "ffmpeg".to_string(),
            enhancer_program: "python3.11".to_string(),
            enhancer_args: vec!["scripts/enhance_audio.py".to_string()],
            stage_timeout: Duration::from_secs(600),
            enhance_timeout: Duration::from_secs(1800),
            enhance_settle: Duration::from_secs(1),
            max_concurrent_runs: 2,
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            scratch_dir: std::env::var("HUSH_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            ffmpeg_path: std::env::var("HUSH_FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            enhancer_program: std::env::var("HUSH_ENHANCER_PROGRAM")
                .unwrap_or(defaults.enhancer_program),
            enhancer_args: std::env::var("HUSH_ENHANCER_ARGS")
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or(defaults.enhancer_args),
            stage_timeout: Duration::from_secs(
                std::env::var("HUSH_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            enhance_timeout: Duration::from_secs(
                std::env::var("HUSH_ENHANCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            enhance_settle: Duration::from_millis(
                std::env::var("HUSH_ENHANCE_SETTLE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            max_concurrent_runs: std::env::var("HUSH_MAX_RUNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_runs),
            sample_rate: std::env::var("HUSH_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_rate),
            channels: std::env::var("HUSH_CHANNELS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channels),
        }
    }

    /// PCM layout for the extraction stage.
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            ..PcmFormat::default()
        }
    }
}
