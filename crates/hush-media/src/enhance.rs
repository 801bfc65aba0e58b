//! Speech enhancement through an isolated child process.
//!
//! The enhancement model is loaded fresh by each child. A crash or leak in
//! the model stays in that process; the pipeline only sees an exit status
//! and the file it was asked to produce.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use hush_models::{Stage, StageResult};
use tracing::{info, warn};

use crate::command::{StageCommand, StageExecutor};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{absolutize, unusable_output_reason};

/// Turns a PCM audio file into an enhanced PCM audio file.
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Enhance `input` into `output`.
    ///
    /// Succeeds only if `output` exists and is non-empty afterwards.
    async fn enhance(&self, input: &Path, output: &Path) -> MediaResult<StageResult>;
}

/// Runs the enhancement engine as `<program> [args..] <input> <output>`.
#[derive(Debug, Clone)]
pub struct EnhancementInvoker {
    program: String,
    args: Vec<String>,
    executor: StageExecutor,
    /// Pause between child exit and the output check
    settle_delay: Duration,
}

impl EnhancementInvoker {
    /// Create an invoker for `program` with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            executor: StageExecutor::new(),
            settle_delay: Duration::ZERO,
        }
    }

    /// Arguments placed before the two path arguments (e.g. a script path).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the engine if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    /// Wait this long after a successful exit before checking the output.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    fn command(&self, input: &Path, output: &Path) -> MediaResult<StageCommand> {
        Ok(StageCommand::new(Stage::Enhancing, &self.program)
            .args(&self.args)
            .path_arg(absolutize(input)?)
            .path_arg(absolutize(output)?))
    }
}

#[async_trait]
impl Enhancer for EnhancementInvoker {
    async fn enhance(&self, input: &Path, output: &Path) -> MediaResult<StageResult> {
        let cmd = self.command(input, output)?;
        info!("Enhancing audio: {} -> {}", input.display(), output.display());

        let result = self.executor.run(&cmd).await?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        // Exit status alone is not trusted
        if let Some(reason) = unusable_output_reason(output).await? {
            warn!(
                stdout = %result.stdout.trim(),
                stderr = %result.stderr.trim(),
                "Enhancer exited 0 but {}: {}",
                reason,
                output.display()
            );
            return Err(MediaError::enhancement_failed(output, reason));
        }

        info!(
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Verified enhanced audio: {}",
            output.display()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// `sh -c <script> <input> <output>` binds the paths to `$0` and `$1`.
    fn shell_enhancer(script: &str) -> EnhancementInvoker {
        EnhancementInvoker::new("sh").with_args(["-c", script])
    }

    fn input_file(dir: &TempDir) -> std::path::PathBuf {
        let input = dir.path().join("a.wav");
        std::fs::write(&input, b"RIFF....WAVEfmt ").unwrap();
        input
    }

    #[test]
    fn test_command_has_two_absolute_paths_last() {
        let invoker = EnhancementInvoker::new("python3.11").with_args(["scripts/enhance_audio.py"]);
        let cmd = invoker
            .command(Path::new("a.wav"), Path::new("a-processed.wav"))
            .unwrap();

        let args = cmd.get_args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], "scripts/enhance_audio.py");
        assert!(Path::new(&args[1]).is_absolute());
        assert!(Path::new(&args[2]).ends_with("a-processed.wav"));
    }

    #[tokio::test]
    async fn test_successful_enhancement() {
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("a-processed.wav");

        let result = shell_enhancer(r#"cp "$0" "$1""#)
            .enhance(&input, &output)
            .await
            .unwrap();

        assert_eq!(result.stage, Stage::Enhancing);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_exit_zero_without_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("a-processed.wav");

        let err = shell_enhancer("exit 0")
            .enhance(&input, &output)
            .await
            .unwrap_err();

        match err {
            MediaError::EnhancementFailed { reason, .. } => {
                assert_eq!(reason, "output file missing")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exit_zero_with_empty_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("a-processed.wav");

        let err = shell_enhancer(r#": > "$1""#)
            .enhance(&input, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::EnhancementFailed { .. }));
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_engine_crash_is_process_failure() {
        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("a-processed.wav");

        let err = shell_enhancer("echo 'model load failed' >&2; exit 3")
            .enhance(&input, &output)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaError::ProcessFailed {
                stage: Stage::Enhancing,
                exit_code: Some(3),
                ..
            }
        ));
    }
}
