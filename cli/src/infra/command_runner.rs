//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::application::ports::{CommandRunner, ProcessEnv};

/// Default timeout for service-manager, `pkill` and `sudo` calls.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(90);

/// Production `CommandRunner`.
///
/// Timed calls race the child against `tokio::time::sleep` and kill it
/// explicitly when the timer wins; dropping the future alone would leave the
/// process running. Every child is spawned `kill_on_drop`, so interrupting
/// the orchestrator also ends whatever it was waiting on.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(%program, ?args, "running");
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        collect_with_timeout(child, program, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        tracing::debug!(%program, ?args, bytes = input.len(), "running with stdin");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Feed stdin concurrently so a child echoing to stdout cannot block on
        // a full pipe. Dropping the handle closes it and the child sees EOF.
        let stdin_handle = child.stdin.take();
        let input_owned = input.to_vec();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin_handle {
                let _ = stdin.write_all(&input_owned).await;
            }
        });

        let output = collect_with_timeout(child, program, self.timeout).await;
        let _ = stdin_task.await;
        output
    }

    async fn run_in(&self, env: &ProcessEnv<'_>, program: &str, args: &[&str]) -> Result<Output> {
        tracing::debug!(%program, ?args, cwd = %env.cwd.display(), "running in workdir");
        tokio::process::Command::new(program)
            .args(args)
            .current_dir(env.cwd)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {program}"))
    }
}

/// Wait for `child`, reading both pipes, and kill it if `timeout` elapses.
async fn collect_with_timeout(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            tracing::warn!(%program, secs = timeout.as_secs(), "command timed out");
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::Path;

    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_status() {
        let runner = TokioCommandRunner::default();
        let out = runner.run("sh", &["-c", "echo hi; exit 3"]).await.unwrap();
        assert_eq!(out.stdout, b"hi\n");
        assert_eq!(out.status.code(), Some(3));
    }

    #[tokio::test]
    async fn kills_command_that_outlives_timeout() {
        let runner = TokioCommandRunner::default();
        let err = runner
            .run_with_timeout("sleep", &["5"], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let runner = TokioCommandRunner::default();
        let out = runner.run_with_stdin("cat", &[], b"unit body").await.unwrap();
        assert_eq!(out.stdout, b"unit body");
    }

    #[tokio::test]
    async fn run_in_applies_cwd_and_vars() {
        let dir = tempfile::tempdir().unwrap();
        let vars = vec![("SARO_PROBE".to_string(), "42".to_string())];
        let env = ProcessEnv {
            cwd: dir.path(),
            vars: &vars,
        };
        let runner = TokioCommandRunner::default();
        let out = runner
            .run_in(&env, "sh", &["-c", "pwd; echo $SARO_PROBE"])
            .await
            .unwrap();
        let text = String::from_utf8(out.stdout).unwrap();
        let mut lines = text.lines();
        let cwd = lines.next().unwrap();
        assert_eq!(
            Path::new(cwd).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert_eq!(lines.next(), Some("42"));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let runner = TokioCommandRunner::default();
        assert!(runner.run("saro-no-such-binary", &[]).await.is_err());
    }
}
