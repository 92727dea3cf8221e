//! Application service — host observation and dry-run planning.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::HostFs;
use crate::domain::config::DeployConfig;
use crate::domain::plan::{HostObservation, Plan, build_plan};

/// Take one read-only snapshot of everything the deploy decisions depend on.
///
/// # Errors
///
/// Returns an error if an existing unit file cannot be read.
pub fn observe(fs: &impl HostFs, cfg: &DeployConfig) -> Result<HostObservation> {
    let unit_path = cfg.unit_path();
    let current_unit = fs
        .read_optional(&unit_path)
        .with_context(|| format!("reading {}", unit_path.display()))?;
    Ok(HostObservation {
        workdir_exists: fs.is_dir(&cfg.deploy_path),
        venv_exists: fs.is_dir(&cfg.venv_path()),
        manifest_exists: fs.exists(&cfg.manifest_path()),
        env_file_exists: fs.exists(&cfg.env_file_path()),
        env_template_exists: fs.exists(&cfg.env_template_path()),
        current_unit,
    })
}

/// Validate, observe and plan without touching the host.
///
/// # Errors
///
/// Returns `ConfigError` for an invalid configuration and
/// `DeployError::MissingWorkdir` when there is nothing to deploy into.
pub fn plan_deploy(fs: &impl HostFs, cfg: &DeployConfig) -> Result<Plan> {
    cfg.validate()?;
    let observed = observe(fs, cfg)?;
    tracing::debug!(?observed, "host observed");
    Ok(build_plan(cfg, &observed)?)
}
