//! Shared test helpers for application service tests.
//!
//! Provides cross-platform `exit_status()`, a scripted `CommandRunner` that
//! records every invocation, and an in-memory host filesystem that doubles as
//! a `UnitWriter`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{
    CommandRunner, HostFs, ProcessEnv, ProgressReporter, UnitWriter,
};
use crate::domain::error::DeployError;

/// Build an `ExitStatus` from a logical exit code (cross-platform).
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn fail_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Scripted runner ───────────────────────────────────────────────────────────

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    /// Program and arguments joined by single spaces.
    pub line: String,
    pub cwd: Option<PathBuf>,
    pub vars: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
    /// Set only for `run_with_timeout`.
    pub timeout: Option<Duration>,
}

/// `CommandRunner` that answers from prefix rules and records every call.
///
/// Unmatched commands succeed with empty output, except `systemctl
/// is-active`, which answers `active` so start verification passes.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Output)>,
    spawn_failures: Vec<String>,
    creates: Vec<(String, PathBuf)>,
    fs: Option<MemFs>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands whose line starts with `prefix` with `output`.
    /// Earlier rules win.
    pub fn respond(mut self, prefix: &str, output: Output) -> Self {
        self.rules.push((prefix.to_string(), output));
        self
    }

    /// Fail to spawn commands whose line starts with `prefix`.
    pub fn fail_spawn(mut self, prefix: &str) -> Self {
        self.spawn_failures.push(prefix.to_string());
        self
    }

    /// Create `dir` in `fs` whenever a command starting with `prefix` succeeds.
    pub fn creates_dir(mut self, fs: &MemFs, prefix: &str, dir: impl Into<PathBuf>) -> Self {
        self.fs = Some(fs.clone());
        self.creates.push((prefix.to_string(), dir.into()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.line.clone()).collect()
    }

    /// Whether any recorded command line contains `needle`.
    pub fn called(&self, needle: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.line.contains(needle))
    }

    /// Index of the first call containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c.line.contains(needle))
    }

    fn answer(&self, call: Call) -> Result<Output> {
        let line = call.line.clone();
        self.calls.borrow_mut().push(call);

        if self.spawn_failures.iter().any(|p| line.starts_with(p.as_str())) {
            anyhow::bail!("failed to spawn {line}");
        }
        let output = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| {
                if line.contains("systemctl is-active") {
                    ok_output(b"active\n")
                } else {
                    ok_output(b"")
                }
            });
        if output.status.success() {
            if let Some(fs) = &self.fs {
                for (prefix, dir) in &self.creates {
                    if line.starts_with(prefix.as_str()) {
                        fs.add_dir(dir);
                    }
                }
            }
        }
        Ok(output)
    }
}

fn join(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.answer(Call {
            line: join(program, args),
            cwd: None,
            vars: Vec::new(),
            stdin: None,
            timeout: None,
        })
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        self.answer(Call {
            line: join(program, args),
            cwd: None,
            vars: Vec::new(),
            stdin: None,
            timeout: Some(timeout),
        })
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output> {
        self.answer(Call {
            line: join(program, args),
            cwd: None,
            vars: Vec::new(),
            stdin: Some(stdin.to_vec()),
            timeout: None,
        })
    }

    async fn run_in(&self, env: &ProcessEnv<'_>, program: &str, args: &[&str]) -> Result<Output> {
        self.answer(Call {
            line: join(program, args),
            cwd: Some(env.cwd.to_path_buf()),
            vars: env.vars.to_vec(),
            stdin: None,
            timeout: None,
        })
    }
}

// ── In-memory host ────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemFsInner {
    dirs: HashSet<PathBuf>,
    files: HashMap<PathBuf, Vec<u8>>,
    read_only: HashSet<PathBuf>,
}

/// Shared in-memory filesystem. Clones see the same contents.
#[derive(Clone, Default)]
pub struct MemFs {
    inner: Rc<RefCell<MemFsInner>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.add_dir(path.into());
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.inner
            .borrow_mut()
            .files
            .insert(path.into(), contents.as_bytes().to_vec());
        self
    }

    /// Make unit writes into `dir` fail as if privilege were missing.
    pub fn with_read_only(self, dir: impl Into<PathBuf>) -> Self {
        self.inner.borrow_mut().read_only.insert(dir.into());
        self
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.inner
            .borrow_mut()
            .dirs
            .insert(path.as_ref().to_path_buf());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.inner
            .borrow()
            .files
            .get(path.as_ref())
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl HostFs for MemFs {
    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.borrow();
        inner.dirs.contains(path) || inner.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.borrow().dirs.contains(path)
    }

    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.file(path))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let Some(bytes) = inner.files.get(from).cloned() else {
            anyhow::bail!("{} not found", from.display());
        };
        inner.files.insert(to.to_path_buf(), bytes);
        Ok(())
    }
}

impl UnitWriter for MemFs {
    async fn write_unit(&self, path: &Path, contents: &str) -> Result<()> {
        let dir = path.parent().unwrap_or(path).to_path_buf();
        if self.inner.borrow().read_only.contains(&dir) {
            return Err(DeployError::PrivilegeRequired {
                path: path.to_path_buf(),
                detail: "sudo: a password is required".to_string(),
            }
            .into());
        }
        self.inner
            .borrow_mut()
            .files
            .insert(path.to_path_buf(), contents.as_bytes().to_vec());
        Ok(())
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// `ProgressReporter` that keeps every message, prefixed by its kind.
#[derive(Default)]
pub struct RecordingReporter {
    messages: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|m| m.strip_prefix("warn: ").map(str::to_owned))
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("ok: {message}"));
    }

    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(format!("warn: {message}"));
    }
}
