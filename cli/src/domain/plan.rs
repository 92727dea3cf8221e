//! Deployment planning — pure decisions from (desired config, observed host).
//!
//! Each step has a `decide_*` function. `build_plan` runs all of them against
//! one observation for a dry run; the deploy service calls them again right
//! before applying each step, because earlier steps change what is observed.

use std::path::PathBuf;

use saro_common::{PlanEntry, PlanReport, Step};

use crate::domain::config::DeployConfig;
use crate::domain::error::DeployError;
use crate::domain::unit::{render_unit, unit_digest};

// ── Observation ──────────────────────────────────────────────────────────────

/// Host facts relevant to planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostObservation {
    pub workdir_exists: bool,
    pub venv_exists: bool,
    pub manifest_exists: bool,
    pub env_file_exists: bool,
    pub env_template_exists: bool,
    /// Current unit file contents, `None` when no unit is installed.
    pub current_unit: Option<String>,
}

// ── Per-step decisions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenvAction {
    Create,
    Reuse,
}

#[must_use]
pub fn decide_venv(venv_exists: bool) -> VenvAction {
    if venv_exists {
        VenvAction::Reuse
    } else {
        VenvAction::Create
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestState {
    Present,
    /// Not in the working tree yet; may arrive with the source sync.
    Pending,
}

#[must_use]
pub fn decide_manifest(manifest_exists: bool) -> ManifestState {
    if manifest_exists {
        ManifestState::Present
    } else {
        ManifestState::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileAction {
    /// Copy the tracked template into place.
    CopyTemplate,
    /// Leave the existing file alone; secrets need manual review.
    Keep,
    /// Neither file exists; nothing to copy.
    MissingTemplate,
}

#[must_use]
pub fn decide_env_file(env_exists: bool, template_exists: bool) -> EnvFileAction {
    match (env_exists, template_exists) {
        (true, _) => EnvFileAction::Keep,
        (false, true) => EnvFileAction::CopyTemplate,
        (false, false) => EnvFileAction::MissingTemplate,
    }
}

/// Unit regeneration. The unit is always rewritten; `changed` only reports
/// whether the bytes differ from what is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitChange {
    pub previous_digest: Option<String>,
    pub next_digest: String,
    pub changed: bool,
}

#[must_use]
pub fn decide_unit(current: Option<&str>, desired: &str) -> UnitChange {
    UnitChange {
        previous_digest: current.map(unit_digest),
        next_digest: unit_digest(desired),
        changed: current != Some(desired),
    }
}

// ── Plan ─────────────────────────────────────────────────────────────────────

/// One planned action, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Halt { pattern: String, service: String },
    EnterWorkdir { path: PathBuf },
    Pull { remote: String, branch: String, ff_only: bool },
    Venv(VenvAction),
    Activate { bin: PathBuf },
    UpgradePip,
    InstallDeps { manifest: ManifestState, extras: Vec<String> },
    EnvFile(EnvFileAction),
    Bootstrap { guarded: bool, command: String },
    WriteUnit(UnitChange),
    Start { service: String },
}

impl Action {
    #[must_use]
    pub fn step(&self) -> Step {
        match self {
            Self::Halt { .. } => Step::Halt,
            Self::EnterWorkdir { .. } => Step::Workdir,
            Self::Pull { .. } => Step::Sync,
            Self::Venv(_) => Step::Venv,
            Self::Activate { .. } => Step::Activate,
            Self::UpgradePip => Step::UpgradePip,
            Self::InstallDeps { .. } => Step::InstallDeps,
            Self::EnvFile(_) => Step::EnvFile,
            Self::Bootstrap { .. } => Step::Bootstrap,
            Self::WriteUnit(_) => Step::WriteUnit,
            Self::Start { .. } => Step::Start,
        }
    }

    /// Whether applying this action changes host state.
    #[must_use]
    pub fn mutates(&self) -> bool {
        match self {
            Self::EnterWorkdir { .. } | Self::Activate { .. } => false,
            Self::Venv(v) => *v == VenvAction::Create,
            Self::EnvFile(e) => *e == EnvFileAction::CopyTemplate,
            _ => true,
        }
    }

    /// One-line operator description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Halt { pattern, service } => {
                format!("kill processes matching '{pattern}', stop {service}")
            }
            Self::EnterWorkdir { path } => format!("use {}", path.display()),
            Self::Pull { remote, branch, ff_only } => {
                let mode = if *ff_only { " (fast-forward only)" } else { "" };
                format!("pull {remote}/{branch}{mode}")
            }
            Self::Venv(VenvAction::Create) => "create virtualenv".to_string(),
            Self::Venv(VenvAction::Reuse) => "reuse existing virtualenv".to_string(),
            Self::Activate { bin } => format!("run packages from {}", bin.display()),
            Self::UpgradePip => "upgrade pip (best effort)".to_string(),
            Self::InstallDeps { manifest, extras } => {
                let pending = match manifest {
                    ManifestState::Present => "",
                    ManifestState::Pending => " (manifest expected from sync)",
                };
                format!("install manifest + {}{pending}", extras.join(" "))
            }
            Self::EnvFile(EnvFileAction::CopyTemplate) => {
                "create env file from template".to_string()
            }
            Self::EnvFile(EnvFileAction::Keep) => {
                "keep existing env file (review secrets manually)".to_string()
            }
            Self::EnvFile(EnvFileAction::MissingTemplate) => {
                "no env file and no template (warn)".to_string()
            }
            Self::Bootstrap { guarded, command } => {
                if *guarded {
                    format!("run `{command}` unless check reports data present")
                } else {
                    format!("run `{command}` (failure tolerated)")
                }
            }
            Self::WriteUnit(change) => match (&change.previous_digest, change.changed) {
                (None, _) => format!("install unit ({})", change.next_digest),
                (Some(prev), true) => {
                    format!("rewrite unit ({prev} -> {})", change.next_digest)
                }
                (Some(_), false) => format!("rewrite unit (unchanged, {})", change.next_digest),
            },
            Self::Start { service } => format!("daemon-reload, enable and start {service}"),
        }
    }
}

/// Ordered list of actions a deploy would take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    #[must_use]
    pub fn to_report(&self, cfg: &DeployConfig) -> PlanReport {
        PlanReport {
            service: cfg.service_name.clone(),
            deploy_path: cfg.deploy_path.display().to_string(),
            entries: self
                .actions
                .iter()
                .map(|a| PlanEntry {
                    step: a.step(),
                    stage: a.step().stage(),
                    action: a.describe(),
                    mutates: a.mutates(),
                })
                .collect(),
        }
    }
}

/// Build the full plan for `cfg` against one observation of the host.
///
/// # Errors
///
/// Returns `DeployError::MissingWorkdir` when the working directory does not
/// exist, since no later step can run without it.
pub fn build_plan(cfg: &DeployConfig, obs: &HostObservation) -> Result<Plan, DeployError> {
    if !obs.workdir_exists {
        return Err(DeployError::MissingWorkdir(cfg.deploy_path.clone()));
    }

    let unit = render_unit(cfg);
    let actions = vec![
        Action::Halt {
            pattern: cfg.process_pattern(),
            service: cfg.service_name.clone(),
        },
        Action::EnterWorkdir {
            path: cfg.deploy_path.clone(),
        },
        Action::Pull {
            remote: cfg.source.remote.clone(),
            branch: cfg.source.branch.clone(),
            ff_only: cfg.source.ff_only,
        },
        Action::Venv(decide_venv(obs.venv_exists)),
        Action::Activate { bin: cfg.venv_bin() },
        Action::UpgradePip,
        Action::InstallDeps {
            manifest: decide_manifest(obs.manifest_exists),
            extras: cfg.python.extra_packages.clone(),
        },
        Action::EnvFile(decide_env_file(
            obs.env_file_exists,
            obs.env_template_exists,
        )),
        Action::Bootstrap {
            guarded: cfg.bootstrap.check.is_some(),
            command: cfg.bootstrap.command.join(" "),
        },
        Action::WriteUnit(decide_unit(obs.current_unit.as_deref(), &unit)),
        Action::Start {
            service: cfg.service_name.clone(),
        },
    ];
    Ok(Plan { actions })
}
