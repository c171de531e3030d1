//! External command execution
//!
//! Collaborator processes (the `gh` CLI, the changelog generator, the
//! dependency report) are all invoked through [`CommandRunner`] so callers
//! can be exercised against recorded output in tests.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::CommandError;

/// Runs an external command and captures its output lines
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args` (program first) and return stdout as ordered lines
    ///
    /// A non-zero exit fails with [`CommandError::NonZeroExit`] carrying the
    /// captured stderr.
    async fn run(&self, args: &[&str]) -> Result<Vec<String>, CommandError>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    async fn run(&self, args: &[&str]) -> Result<Vec<String>, CommandError> {
        (**self).run(args).await
    }
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    async fn run(&self, args: &[&str]) -> Result<Vec<String>, CommandError> {
        (**self).run(args).await
    }
}

/// [`CommandRunner`] backed by a real child process
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    silent: bool,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    /// Create a runner that logs captured output as it completes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner with output logging suppressed
    ///
    /// Identical semantics to [`ProcessRunner::new`] otherwise.
    pub fn silent() -> Self {
        Self {
            silent: true,
            working_dir: None,
        }
    }

    /// Run commands from `dir` instead of the current directory
    ///
    /// Concurrent tasks must each own their working directory; the runner
    /// itself keeps no mutable state.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let command_line = args.join(" ");
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| CommandError::ToolNotFound("<empty command>".to_string()))?;

        debug!(command = %command_line, "running external command");

        let mut command = tokio::process::Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| CommandError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<String> = stdout.lines().map(str::to_string).collect();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
            return Err(CommandError::NonZeroExit {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        if !self.silent {
            for line in &lines {
                info!(command = %program, "{line}");
            }
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_lines_in_order() {
        let runner = ProcessRunner::new();
        let lines = runner
            .run(&["sh", "-c", "echo first; echo second"])
            .await
            .unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_command_and_stderr() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(&["sh", "-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();

        match err {
            CommandError::NonZeroExit {
                command,
                code,
                stderr,
            } => {
                assert!(command.contains("exit 3"));
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_silent_runner_has_identical_semantics() {
        let runner = ProcessRunner::silent();
        let lines = runner.run(&["echo", "quiet"]).await.unwrap();
        assert_eq!(lines, vec!["quiet"]);

        assert!(runner.run(&["sh", "-c", "exit 1"]).await.is_err());
    }

    #[tokio::test]
    async fn test_runs_in_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::silent().in_dir(dir.path());
        let lines = runner.run(&["pwd"]).await.unwrap();
        assert_eq!(
            lines,
            vec![dir.path().canonicalize().unwrap().display().to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let runner = ProcessRunner::silent();
        let err = runner.run(&["definitely-not-a-real-tool"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
