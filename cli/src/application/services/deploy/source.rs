//! Step 3: synchronize source.

use anyhow::{Context, Result};
use saro_common::Step;

use super::ensure_success;
use crate::application::ports::{CommandRunner, ProcessEnv};
use crate::domain::config::DeployConfig;

/// `git pull` the tracked branch into the working directory.
///
/// Diverged history, merge conflicts and network errors all surface as
/// `DeployError::CommandFailed`; nothing is resolved automatically.
pub(super) async fn sync_source(
    runner: &impl CommandRunner,
    workdir: &ProcessEnv<'_>,
    cfg: &DeployConfig,
) -> Result<()> {
    let mut args = vec!["pull"];
    if cfg.source.ff_only {
        args.push("--ff-only");
    }
    args.extend([cfg.source.remote.as_str(), cfg.source.branch.as_str()]);

    // Never block on a credential prompt.
    let mut vars = workdir.vars.to_vec();
    vars.push(("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()));
    let env = ProcessEnv {
        cwd: workdir.cwd,
        vars: &vars,
    };

    let output = runner
        .run_in(&env, "git", &args)
        .await
        .context("running git pull")?;
    ensure_success(Step::Sync, "git", &args, &output)?;
    tracing::info!(
        remote = %cfg.source.remote,
        branch = %cfg.source.branch,
        summary = %String::from_utf8_lossy(&output.stdout).lines().last().unwrap_or(""),
        "source synchronised"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::application::services::test_support::{ScriptedRunner, fail_output};
    use crate::domain::error::DeployError;

    fn workdir() -> ProcessEnv<'static> {
        ProcessEnv {
            cwd: Path::new("/var/www/saro"),
            vars: &[],
        }
    }

    #[tokio::test]
    async fn pulls_fast_forward_only_in_workdir() {
        let runner = ScriptedRunner::new();
        sync_source(&runner, &workdir(), &DeployConfig::default())
            .await
            .unwrap();
        let call = &runner.calls()[0];
        assert_eq!(call.line, "git pull --ff-only origin main");
        assert_eq!(call.cwd.as_deref(), Some(Path::new("/var/www/saro")));
        assert!(call.vars.contains(&("GIT_TERMINAL_PROMPT".into(), "0".into())));
    }

    #[tokio::test]
    async fn merge_mode_omits_ff_only() {
        let runner = ScriptedRunner::new();
        let mut cfg = DeployConfig::default();
        cfg.source.ff_only = false;
        cfg.source.branch = "release".into();
        sync_source(&runner, &workdir(), &cfg).await.unwrap();
        assert_eq!(runner.lines(), vec!["git pull origin release"]);
    }

    #[tokio::test]
    async fn diverged_history_is_fatal_with_git_exit_code() {
        let runner = ScriptedRunner::new().respond(
            "git pull",
            fail_output(128, b"fatal: Not possible to fast-forward, aborting."),
        );
        let err = sync_source(&runner, &workdir(), &DeployConfig::default())
            .await
            .unwrap_err();
        let deploy = err.downcast_ref::<DeployError>().expect("typed error");
        assert_eq!(deploy.exit_code(), 128);
        assert!(err.to_string().contains("fast-forward"), "got: {err}");
    }
}
