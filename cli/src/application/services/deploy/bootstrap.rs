//! Step 9: baseline data bootstrap (administrator account and friends).

use anyhow::{Context, Result};
use saro_common::{Step, StepOutcome};

use super::{ensure_success, last_stderr_line};
use crate::application::ports::{CommandRunner, HostFs, ProcessEnv};
use crate::domain::config::DeployConfig;

/// Run the bootstrap command inside the virtualenv.
///
/// With a `check` configured the step is check-then-act: a zero exit from the
/// check skips the command, and a failing command is fatal. Without a check
/// the command itself is expected to be idempotent, so a nonzero exit is
/// tolerated with a warning.
pub(super) async fn run_bootstrap(
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    active: &ProcessEnv<'_>,
    cfg: &DeployConfig,
) -> Result<(StepOutcome, Option<String>)> {
    if let Some(check) = &cfg.bootstrap.check {
        let (program, args) = resolve(fs, cfg, check);
        let output = runner
            .run_in(active, &program, &args)
            .await
            .with_context(|| format!("running bootstrap check {program}"))?;
        if output.status.success() {
            tracing::info!("baseline data already present, bootstrap skipped");
            return Ok((
                StepOutcome::Skipped,
                Some("baseline data already present".to_string()),
            ));
        }
        let (program, args) = resolve(fs, cfg, &cfg.bootstrap.command);
        let output = runner
            .run_in(active, &program, &args)
            .await
            .with_context(|| format!("running bootstrap command {program}"))?;
        ensure_success(Step::Bootstrap, &program, &args, &output)?;
        return Ok((StepOutcome::Applied, None));
    }

    let (program, args) = resolve(fs, cfg, &cfg.bootstrap.command);
    let output = runner
        .run_in(active, &program, &args)
        .await
        .with_context(|| format!("running bootstrap command {program}"))?;
    if output.status.success() {
        return Ok((StepOutcome::Applied, None));
    }
    Ok((
        StepOutcome::Tolerated,
        Some(format!(
            "bootstrap `{}` failed, baseline data may already exist: {}",
            cfg.bootstrap.command.join(" "),
            last_stderr_line(&output)
        )),
    ))
}

/// Split argv and point bare program names at the virtualenv when the venv
/// provides them.
fn resolve<'a>(fs: &impl HostFs, cfg: &DeployConfig, argv: &'a [String]) -> (String, Vec<&'a str>) {
    let (first, rest) = argv.split_first().map_or(("", &[][..]), |(f, r)| (f.as_str(), r));
    let args = rest.iter().map(String::as_str).collect();
    if first.contains('/') {
        return (first.to_string(), args);
    }
    let in_venv = cfg.venv_bin().join(first);
    if fs.exists(&in_venv) {
        (in_venv.display().to_string(), args)
    } else {
        (first.to_string(), args)
    }
}
