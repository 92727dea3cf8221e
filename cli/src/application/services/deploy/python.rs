//! Steps 4–7: virtualenv, pip upgrade, dependency install.

use std::path::PathBuf;

use anyhow::{Context, Result};
use saro_common::{Step, StepOutcome};

use super::{ensure_success, last_stderr_line};
use crate::application::ports::{CommandRunner, HostFs, ProcessEnv};
use crate::domain::config::DeployConfig;
use crate::domain::error::DeployError;
use crate::domain::plan::{ManifestState, VenvAction, decide_manifest, decide_venv};

/// Create the virtualenv unless it already exists.
pub(super) async fn ensure_venv(
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    workdir: &ProcessEnv<'_>,
    cfg: &DeployConfig,
) -> Result<StepOutcome> {
    let venv = cfg.venv_path();
    match decide_venv(fs.is_dir(&venv)) {
        VenvAction::Reuse => {
            tracing::info!(venv = %venv.display(), "reusing virtualenv");
            Ok(StepOutcome::Skipped)
        }
        VenvAction::Create => {
            let venv_arg = venv.display().to_string();
            let args = ["-m", "venv", venv_arg.as_str()];
            let interpreter = cfg.python.interpreter.as_str();
            let output = runner
                .run_in(workdir, interpreter, &args)
                .await
                .with_context(|| format!("running {interpreter} -m venv"))?;
            ensure_success(Step::Venv, interpreter, &args, &output)?;
            tracing::info!(venv = %venv.display(), "virtualenv created");
            Ok(StepOutcome::Applied)
        }
    }
}

/// Best-effort `pip install --upgrade pip`.
///
/// A nonzero exit is tolerated and returned as a warning; only a failure to
/// run the venv interpreter at all is fatal.
pub(super) async fn upgrade_pip(
    runner: &impl CommandRunner,
    active: &ProcessEnv<'_>,
    cfg: &DeployConfig,
) -> Result<(StepOutcome, Option<String>)> {
    let python = venv_tool(cfg, "python");
    let args = ["-m", "pip", "install", "--upgrade", "pip"];
    let output = runner
        .run_in(active, &python, &args)
        .await
        .context("running pip upgrade inside the virtualenv")?;
    if output.status.success() {
        return Ok((StepOutcome::Applied, None));
    }
    let reason = last_stderr_line(&output);
    Ok((
        StepOutcome::Tolerated,
        Some(format!("pip upgrade failed, continuing with current pip: {reason}")),
    ))
}

/// Install the manifest, then the always-required extra packages.
pub(super) async fn install_deps(
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    active: &ProcessEnv<'_>,
    cfg: &DeployConfig,
) -> Result<()> {
    let manifest = cfg.manifest_path();
    if decide_manifest(fs.exists(&manifest)) == ManifestState::Pending {
        return Err(DeployError::MissingManifest(manifest).into());
    }

    let pip = venv_tool(cfg, "pip");
    let manifest_arg = manifest.display().to_string();
    let args = ["install", "-r", manifest_arg.as_str()];
    let output = runner
        .run_in(active, &pip, &args)
        .await
        .context("running pip install")?;
    ensure_success(Step::InstallDeps, &pip, &args, &output)?;

    if !cfg.python.extra_packages.is_empty() {
        let mut args = vec!["install"];
        args.extend(cfg.python.extra_packages.iter().map(String::as_str));
        let output = runner
            .run_in(active, &pip, &args)
            .await
            .context("running pip install for extra packages")?;
        ensure_success(Step::InstallDeps, &pip, &args, &output)?;
    }
    tracing::info!(manifest = %manifest.display(), "dependencies installed");
    Ok(())
}

/// Absolute path of a tool inside the virtualenv.
fn venv_tool(cfg: &DeployConfig, name: &str) -> String {
    let path: PathBuf = cfg.venv_bin().join(name);
    path.display().to_string()
}
