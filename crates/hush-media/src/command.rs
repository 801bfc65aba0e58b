//! Stage command building and execution.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use hush_models::{Stage, StageResult};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::absolutize;

/// A fully-specified external-process invocation for one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageCommand {
    stage: Stage,
    program: String,
    args: Vec<OsString>,
    /// Arguments that name files; all must be absolute
    path_args: Vec<PathBuf>,
}

impl StageCommand {
    /// Create a new command for `stage` running `program`.
    pub fn new(stage: Stage, program: impl Into<String>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            path_args: Vec::new(),
        }
    }

    /// Add a plain argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple plain arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Add an argument naming a file.
    pub fn path_arg(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.args.push(path.clone().into_os_string());
        self.path_args.push(path);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Reject any relative path argument.
    pub fn validate(&self) -> MediaResult<()> {
        match self.path_args.iter().find(|p| !p.is_absolute()) {
            Some(relative) => Err(MediaError::RelativePath(relative.clone())),
            None => Ok(()),
        }
    }

    /// Render as a shell-like string for logging.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Runs stage commands as child processes.
///
/// The caller is suspended until the child exits; stdout and stderr are
/// captured in full. A non-zero exit is a `ProcessFailed`, and exceeding the
/// timeout kills the child and reports `Timeout`.
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    timeout: Option<Duration>,
}

impl StageExecutor {
    /// Create a new executor without a timeout.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command to completion.
    pub async fn run(&self, cmd: &StageCommand) -> MediaResult<StageResult> {
        cmd.validate()?;

        let stage = cmd.stage();
        debug!(stage = %stage, "Running: {}", cmd.display());

        let start = Instant::now();
        let child = Command::new(cmd.program())
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::Spawn {
                stage,
                program: cmd.program().to_string(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, and
        // kill_on_drop reaps it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        stage = %stage,
                        "{} timed out after {} seconds, killing process",
                        cmd.program(),
                        limit.as_secs()
                    );
                    return Err(MediaError::Timeout {
                        stage,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        let elapsed = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            debug!(
                stage = %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                "{} completed",
                cmd.program()
            );
            Ok(StageResult {
                stage,
                exit_code: output.status.code().unwrap_or(0),
                stdout,
                stderr,
                elapsed,
            })
        } else {
            warn!(
                stage = %stage,
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "{} failed",
                cmd.program()
            );
            Err(MediaError::process_failed(
                stage,
                output.status.code(),
                stderr,
            ))
        }
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// FFmpeg binary name or path
    program: String,
    /// Input file paths, in `-i` order
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with one input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            inputs: vec![input.as_ref().to_path_buf()],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Use a specific FFmpeg binary.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Add another input file.
    pub fn add_input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(input.as_ref().to_path_buf());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Select a stream, e.g. `0:v:0`.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Drop video streams.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio sample rate in Hz.
    pub fn audio_rate(self, hz: u32) -> Self {
        self.output_arg("-ar").output_arg(hz.to_string())
    }

    /// Set audio channel count.
    pub fn audio_channels(self, channels: u16) -> Self {
        self.output_arg("-ac").output_arg(channels.to_string())
    }

    /// End output at the shortest stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments as strings.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Convert into a stage command with every path resolved to absolute form.
    pub fn into_stage_command(self, stage: Stage) -> MediaResult<StageCommand> {
        let mut cmd = StageCommand::new(stage, self.program);

        if self.overwrite {
            cmd = cmd.arg("-y");
        }
        cmd = cmd.arg("-v").arg(&self.log_level);

        for input in &self.inputs {
            cmd = cmd.arg("-i").path_arg(absolutize(input)?);
        }

        cmd = cmd.args(&self.output_args);
        Ok(cmd.path_arg(absolutize(&self.output)?))
    }
}

/// Locate a program on `PATH` (or accept an existing explicit path).
pub fn check_program(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::ProgramNotFound {
        program: program.to_string(),
    })
}
