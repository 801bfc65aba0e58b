//! External-process stages for the Hush pipeline.
//!
//! This crate provides:
//! - A stage executor that runs a child process, captures its output and
//!   converts non-zero exit (or timeout) into a typed failure
//! - Type-safe FFmpeg command building for audio extraction and re-muxing
//! - The speech-enhancement invoker with output verification
//! - Run-scoped tracking and cleanup of temporary artifacts

pub mod artifacts;
pub mod audio;
pub mod command;
pub mod enhance;
pub mod error;
pub mod fs_utils;

pub use artifacts::{ArtifactTracker, PurgeReport};
pub use audio::{FfmpegTranscoder, PcmFormat, Transcoder};
pub use command::{check_program, FfmpegCommand, StageCommand, StageExecutor};
pub use enhance::{EnhancementInvoker, Enhancer};
pub use error::{MediaError, MediaResult};
