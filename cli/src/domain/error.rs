//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use saro_common::{Stage, Step};
use thiserror::Error;

// ── Deploy errors ─────────────────────────────────────────────────────────────

/// Fatal step failures. Any of these ends the run in `FAILED`.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Working directory {} does not exist. Clone the application there first.", .0.display())]
    MissingWorkdir(PathBuf),

    #[error("{step} failed: `{command}` {}\n{stderr}", describe_exit(.code))]
    CommandFailed {
        step: Step,
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Dependency manifest {} not found after source sync.", .0.display())]
    MissingManifest(PathBuf),

    #[error(
        "Cannot write supervision unit {}: elevated privilege required.\n{detail}\n\nRun as root or allow passwordless sudo for this user.",
        .path.display()
    )]
    PrivilegeRequired { path: PathBuf, detail: String },

    #[error("Service '{service}' did not reach a running state.\n\n{status}")]
    NotRunning { service: String, status: String },
}

impl DeployError {
    /// The step that raised this error.
    #[must_use]
    pub fn step(&self) -> Step {
        match self {
            Self::MissingWorkdir(_) => Step::Workdir,
            Self::CommandFailed { step, .. } => *step,
            Self::MissingManifest(_) => Step::InstallDeps,
            Self::PrivilegeRequired { .. } => Step::WriteUnit,
            Self::NotRunning { .. } => Step::Start,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.step().stage()
    }

    /// Stable machine-readable name, used as the JSON error `code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingWorkdir(_) => "missing_workdir",
            Self::CommandFailed { .. } => "command_failed",
            Self::MissingManifest(_) => "missing_manifest",
            Self::PrivilegeRequired { .. } => "privilege_required",
            Self::NotRunning { .. } => "not_running",
        }
    }

    /// Process exit code for this failure.
    ///
    /// The exit code of the failing external command is propagated when it
    /// is known and nonzero; everything else maps to `1`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

#[allow(clippy::ref_option)] // called from the thiserror format args with a field reference
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "was terminated by a signal".to_string(),
        |c| format!("exited with status {c}"),
    )
}

// ── Stage errors ──────────────────────────────────────────────────────────────

/// Illegal transition in the per-run state machine.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid stage transition {from} -> {to}")]
pub struct StageError {
    pub from: Stage,
    pub to: Stage,
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to deployment configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be an absolute path, got '{value}'")]
    NotAbsolute { key: &'static str, value: String },

    #[error("Invalid service name '{0}': must match ^[A-Za-z0-9][A-Za-z0-9_.@-]*$")]
    InvalidServiceName(String),

    #[error("Invalid server.bind '{0}': expected host:port, e.g. 0.0.0.0:5000")]
    InvalidBind(String),

    #[error("{key} must be at least 1")]
    ZeroValue { key: &'static str },

    #[error("{key} must not be empty")]
    EmptyCommand { key: &'static str },

    #[error("Invalid venv_dir '{0}': must be a relative path inside deploy_path")]
    InvalidVenvDir(String),

    #[error("{key} must not contain {what}, got {value:?}")]
    UnsafeValue {
        key: &'static str,
        what: &'static str,
        value: String,
    },
}
