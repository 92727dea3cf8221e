use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of a single deployment run.
///
/// A run walks these in declaration order from `Init` to `Running`.
/// `Failed` is terminal and reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    Stopping,
    Syncing,
    ProvisioningEnv,
    InstallingDeps,
    Configuring,
    BootstrappingData,
    WritingSupervisionUnit,
    Starting,
    Running,
    Failed,
}

impl Stage {
    /// Stable upper-case name, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Stopping => "STOPPING",
            Self::Syncing => "SYNCING",
            Self::ProvisioningEnv => "PROVISIONING_ENV",
            Self::InstallingDeps => "INSTALLING_DEPS",
            Self::Configuring => "CONFIGURING",
            Self::BootstrappingData => "BOOTSTRAPPING_DATA",
            Self::WritingSupervisionUnit => "WRITING_SUPERVISION_UNIT",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Running | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provisioning step of the deployment pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Halt,
    Workdir,
    Sync,
    Venv,
    Activate,
    UpgradePip,
    InstallDeps,
    EnvFile,
    Bootstrap,
    WriteUnit,
    Start,
}

impl Step {
    /// All steps in the order a deployment applies them.
    pub const ALL: [Step; 11] = [
        Step::Halt,
        Step::Workdir,
        Step::Sync,
        Step::Venv,
        Step::Activate,
        Step::UpgradePip,
        Step::InstallDeps,
        Step::EnvFile,
        Step::Bootstrap,
        Step::WriteUnit,
        Step::Start,
    ];

    /// The run stage this step belongs to.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::Halt => Stage::Stopping,
            Self::Workdir | Self::Sync => Stage::Syncing,
            Self::Venv | Self::Activate => Stage::ProvisioningEnv,
            Self::UpgradePip | Self::InstallDeps => Stage::InstallingDeps,
            Self::EnvFile => Stage::Configuring,
            Self::Bootstrap => Stage::BootstrappingData,
            Self::WriteUnit => Stage::WritingSupervisionUnit,
            Self::Start => Stage::Starting,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Workdir => "workdir",
            Self::Sync => "sync",
            Self::Venv => "venv",
            Self::Activate => "activate",
            Self::UpgradePip => "upgrade_pip",
            Self::InstallDeps => "install_deps",
            Self::EnvFile => "env_file",
            Self::Bootstrap => "bootstrap",
            Self::WriteUnit => "write_unit",
            Self::Start => "start",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when a step was applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step changed host state.
    Applied,
    /// A check-only step whose precondition held.
    Verified,
    /// Observed state already matched; nothing was done.
    Skipped,
    /// The step failed in a way the run tolerates.
    Tolerated,
}

/// Record of one applied step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub stage: Stage,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of a completed `deploy` run (`--json` output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub service: String,
    pub deploy_path: String,
    pub final_stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    /// Operator-facing warnings, e.g. secrets that need manual review.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One line of a dry-run plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub step: Step,
    pub stage: Stage,
    pub action: String,
    /// Whether applying this entry would change host state.
    pub mutates: bool,
}

/// Dry-run plan (`plan --json` output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub service: String,
    pub deploy_path: String,
    pub entries: Vec<PlanEntry>,
}

/// Supervisor view of the deployed service (`status --json` output).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: String,
    /// Raw `systemctl is-active` answer, e.g. `active`, `inactive`, `failed`.
    pub active: String,
    /// Raw `systemctl is-enabled` answer, e.g. `enabled`, `disabled`.
    pub enabled: String,
    pub unit_path: String,
    pub unit_present: bool,
}

impl ServiceStatus {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active == "active"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_screaming_snake() {
        let json = serde_json::to_string(&Stage::WritingSupervisionUnit).unwrap();
        assert_eq!(json, "\"WRITING_SUPERVISION_UNIT\"");
    }

    #[test]
    fn stage_display_matches_serialized_form() {
        for stage in [Stage::Init, Stage::ProvisioningEnv, Stage::Failed] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json.trim_matches('"'), stage.to_string());
        }
    }

    #[test]
    fn only_running_and_failed_are_terminal() {
        assert!(Stage::Running.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Starting.is_terminal());
        assert!(!Stage::Init.is_terminal());
    }

    #[test]
    fn step_stages_are_non_decreasing_in_order() {
        let stages: Vec<Stage> = Step::ALL.iter().map(|s| s.stage()).collect();
        let mut sorted = stages.clone();
        sorted.sort_by_key(|s| *s as u8);
        assert_eq!(stages, sorted);
    }

    #[test]
    fn step_record_omits_empty_detail() {
        let rec = StepRecord {
            step: Step::Venv,
            stage: Stage::ProvisioningEnv,
            outcome: StepOutcome::Skipped,
            detail: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("detail"), "got: {json}");
        assert!(json.contains("\"step\":\"venv\""), "got: {json}");
    }

    #[test]
    fn verified_outcome_is_distinct_from_skipped() {
        assert_eq!(
            serde_json::to_string(&StepOutcome::Verified).unwrap(),
            "\"verified\""
        );
        assert_ne!(StepOutcome::Verified, StepOutcome::Skipped);
    }

    #[test]
    fn service_status_running_only_when_active() {
        let mut status = ServiceStatus {
            service: "saro".into(),
            active: "active".into(),
            enabled: "enabled".into(),
            unit_path: "/etc/systemd/system/saro.service".into(),
            unit_present: true,
        };
        assert!(status.is_running());
        status.active = "activating".into();
        assert!(!status.is_running());
    }
}
