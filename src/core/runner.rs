//! Runs a catalog script as a child process.

use super::NotifyMode;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub script_path: PathBuf,
    pub notify: NotifyMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Empty unless the request asked for `stdout` notification.
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Launches scripts. `Err` means the process could not be started at all.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, request: RunRequest) -> io::Result<RunOutput>;
}

/// Executes the script file directly, inside the folder that contains it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, request: RunRequest) -> io::Result<RunOutput> {
        let mut command = Command::new(&request.script_path);
        if let Some(dir) = request.script_path.parent() {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(if request.notify == NotifyMode::Stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped());

        tracing::info!(path = %request.script_path.display(), notify = %request.notify, "Running script");
        let output = command.output().await?;

        let result = RunOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(
            path = %request.script_path.display(),
            exit_code = ?result.exit_code,
            "Script finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils::test_helpers::write_executable_script;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_stdout_mode_captures_output_in_script_folder() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_executable_script(dir.path(), "tools/where.sh", "#!/bin/sh\npwd\n");

        let output = ProcessRunner
            .run(RunRequest {
                script_path: script,
                notify: NotifyMode::Stdout,
            })
            .await
            .unwrap();

        assert!(output.success());
        let expected = dir.path().join("tools").canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(output.stdout.trim()).canonicalize().unwrap(),
            expected
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_status_mode_discards_stdout_but_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_executable_script(
            dir.path(),
            "fail.sh",
            "#!/bin/sh\necho out\necho broken >&2\nexit 3\n",
        );

        let output = ProcessRunner
            .run(RunRequest {
                script_path: script,
                notify: NotifyMode::Status,
            })
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(output.stdout.is_empty());
        assert_eq!(output.stderr.trim(), "broken");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_script_fails_to_launch() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProcessRunner
            .run(RunRequest {
                script_path: dir.path().join("missing.sh"),
                notify: NotifyMode::Status,
            })
            .await;

        assert!(result.is_err());
    }
}
