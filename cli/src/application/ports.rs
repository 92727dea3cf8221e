//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Working directory and extra environment for a child process.
pub struct ProcessEnv<'a> {
    /// Directory the child runs in.
    pub cwd: &'a Path,
    /// Variables set on top of the inherited environment.
    pub vars: &'a [(String, String)],
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program in `env.cwd` with `env.vars` applied.
    ///
    /// No timeout: source sync and package installs take as long as the
    /// network needs.
    async fn run_in(&self, env: &ProcessEnv<'_>, program: &str, args: &[&str]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Host Filesystem Port ──────────────────────────────────────────────────────

/// Abstracts the target host's filesystem.
pub trait HostFs {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Read a file, returning `None` if it does not exist.
    fn read_optional(&self, path: &Path) -> Result<Option<String>>;
    /// Copy `from` to `to` byte for byte.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;
}

// ── Unit Writer Port ──────────────────────────────────────────────────────────

/// Installs supervision unit files, which usually needs elevated privilege.
#[allow(async_fn_in_trait)]
pub trait UnitWriter {
    /// Replace `path` with `contents`.
    ///
    /// Implementations must never leave a partially written file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::PrivilegeRequired` (wrapped) when the unit
    /// directory is not writable.
    async fn write_unit(&self, path: &Path, contents: &str) -> Result<()>;
}
