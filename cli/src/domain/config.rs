//! Domain types and validators for deployment configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.
//! Every default below is the value the deployment used before it became
//! configurable, so an empty config file deploys exactly as before.

#![allow(clippy::expect_used)] // Service-name pattern is a compile-time constant

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Search path used when the caller has no `PATH` of its own.
pub const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

static SERVICE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.@-]*$").expect("valid regex"));

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Human-readable name, used as the unit `Description=`.
    pub app_name: String,
    /// Application checkout on the target host.
    pub deploy_path: PathBuf,
    /// systemd service name (without `.service`).
    pub service_name: String,
    /// Virtualenv directory, relative to `deploy_path`.
    pub venv_dir: PathBuf,
    /// `pkill -f` pattern for stray application processes.
    /// Derived from `server.app` when unset.
    pub process_pattern: Option<String>,
    pub source: SourceConfig,
    pub python: PythonConfig,
    pub env_file: EnvFileConfig,
    pub bootstrap: BootstrapConfig,
    pub server: ServerConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            app_name: "SARO Education Management System".to_string(),
            deploy_path: PathBuf::from("/var/www/saro"),
            service_name: "saro".to_string(),
            venv_dir: PathBuf::from("venv"),
            process_pattern: None,
            source: SourceConfig::default(),
            python: PythonConfig::default(),
            env_file: EnvFileConfig::default(),
            bootstrap: BootstrapConfig::default(),
            server: ServerConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Source synchronisation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub remote: String,
    pub branch: String,
    /// Refuse to create merge commits; diverged history fails the run.
    pub ff_only: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: "main".to_string(),
            ff_only: true,
        }
    }
}

/// Python environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Host interpreter used only to create the virtualenv.
    pub interpreter: String,
    /// Dependency manifest, relative to `deploy_path`.
    pub manifest: PathBuf,
    /// Packages installed after the manifest on every run.
    pub extra_packages: Vec<String>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            manifest: PathBuf::from("requirements.txt"),
            extra_packages: vec!["gunicorn".to_string()],
        }
    }
}

/// Environment configuration file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvFileConfig {
    pub path: PathBuf,
    pub template: PathBuf,
}

impl Default for EnvFileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".env"),
            template: PathBuf::from(".env.example"),
        }
    }
}

/// Persistent-state bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Command that creates baseline records, run inside the virtualenv.
    pub command: Vec<String>,
    /// Optional probe; exit status 0 means the records already exist.
    pub check: Option<Vec<String>>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            command: vec!["python".to_string(), "init_db.py".to_string()],
            check: None,
        }
    }
}

/// gunicorn settings rendered into the unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: u32,
    pub timeout_secs: u32,
    /// WSGI entry point, `module:callable`.
    pub app: String,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            workers: 4,
            timeout_secs: 120,
            app: "app:app".to_string(),
            user: None,
            group: None,
        }
    }
}

/// How privileged commands are executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Prefix with `sudo -n`; a password prompt counts as missing privilege.
    #[default]
    Sudo,
    /// Already running as root; run commands as-is.
    Root,
}

impl Privilege {
    /// Build the argv for a command that needs elevated privilege.
    #[must_use]
    pub fn wrap(self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        match self {
            Self::Sudo => {
                let mut argv = Vec::with_capacity(args.len() + 2);
                argv.push("-n".to_string());
                argv.push(program.to_string());
                argv.extend(args.iter().map(|a| (*a).to_string()));
                ("sudo".to_string(), argv)
            }
            Self::Root => (
                program.to_string(),
                args.iter().map(|a| (*a).to_string()).collect(),
            ),
        }
    }
}

/// Service manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub unit_dir: PathBuf,
    pub privilege: Privilege,
    /// `systemctl is-active` polls after `start`.
    pub verify_attempts: u32,
    pub verify_interval_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            unit_dir: PathBuf::from("/etc/systemd/system"),
            privilege: Privilege::Sudo,
            verify_attempts: 10,
            verify_interval_ms: 1000,
        }
    }
}

// ── Derived paths ────────────────────────────────────────────────────────────

impl DeployConfig {
    /// Absolute path of the virtualenv.
    #[must_use]
    pub fn venv_path(&self) -> PathBuf {
        self.deploy_path.join(&self.venv_dir)
    }

    #[must_use]
    pub fn venv_bin(&self) -> PathBuf {
        self.venv_path().join("bin")
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.deploy_path.join(&self.python.manifest)
    }

    #[must_use]
    pub fn env_file_path(&self) -> PathBuf {
        self.deploy_path.join(&self.env_file.path)
    }

    #[must_use]
    pub fn env_template_path(&self) -> PathBuf {
        self.deploy_path.join(&self.env_file.template)
    }

    #[must_use]
    pub fn unit_name(&self) -> String {
        format!("{}.service", self.service_name)
    }

    #[must_use]
    pub fn unit_path(&self) -> PathBuf {
        self.supervisor.unit_dir.join(self.unit_name())
    }

    /// `pkill -f` pattern. The bracket keeps the pattern from matching the
    /// `sudo pkill` command line that carries it.
    #[must_use]
    pub fn process_pattern(&self) -> String {
        self.process_pattern
            .clone()
            .unwrap_or_else(|| format!("[g]unicorn.*{}", self.server.app))
    }

    /// Environment that activates the virtualenv for child processes.
    ///
    /// `host_path` is the caller's own `PATH`; the venv `bin/` is prepended.
    #[must_use]
    pub fn activation_vars(&self, host_path: Option<&str>) -> Vec<(String, String)> {
        let host = host_path.filter(|p| !p.is_empty()).unwrap_or(FALLBACK_PATH);
        vec![
            (
                "VIRTUAL_ENV".to_string(),
                self.venv_path().display().to_string(),
            ),
            (
                "PATH".to_string(),
                format!("{}:{host}", self.venv_bin().display()),
            ),
        ]
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first rule the configuration breaks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_absolute("deploy_path", &self.deploy_path)?;
        require_absolute("supervisor.unit_dir", &self.supervisor.unit_dir)?;

        if !SERVICE_NAME_RE.is_match(&self.service_name) {
            return Err(ConfigError::InvalidServiceName(self.service_name.clone()));
        }
        if !is_contained_relative(&self.venv_dir) {
            return Err(ConfigError::InvalidVenvDir(
                self.venv_dir.display().to_string(),
            ));
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBind(self.server.bind.clone()));
        }
        if self.server.workers == 0 {
            return Err(ConfigError::ZeroValue { key: "server.workers" });
        }
        if self.server.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue {
                key: "server.timeout_secs",
            });
        }
        if self.supervisor.verify_attempts == 0 {
            return Err(ConfigError::ZeroValue {
                key: "supervisor.verify_attempts",
            });
        }
        if self.bootstrap.command.is_empty() {
            return Err(ConfigError::EmptyCommand {
                key: "bootstrap.command",
            });
        }
        if self.bootstrap.check.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::EmptyCommand {
                key: "bootstrap.check",
            });
        }
        self.validate_unit_values()
    }
}

impl DeployConfig {
    /// Values rendered into the unit must stay on one line, and those that
    /// land in `ExecStart=` or other single-token directives must not split.
    fn validate_unit_values(&self) -> Result<(), ConfigError> {
        require_single_line("app_name", &self.app_name)?;
        if let Some(pattern) = &self.process_pattern {
            require_single_line("process_pattern", pattern)?;
        }

        require_token("deploy_path", &self.deploy_path.to_string_lossy())?;
        require_token("venv_dir", &self.venv_dir.to_string_lossy())?;
        require_token("supervisor.unit_dir", &self.supervisor.unit_dir.to_string_lossy())?;
        require_token("server.app", &self.server.app)?;
        if let Some(user) = &self.server.user {
            require_token("server.user", user)?;
        }
        if let Some(group) = &self.server.group {
            require_token("server.group", group)?;
        }
        Ok(())
    }
}

fn require_single_line(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.chars().any(char::is_control) {
        return Err(ConfigError::UnsafeValue {
            key,
            what: "control characters",
            value: value.to_string(),
        });
    }
    Ok(())
}

fn require_token(key: &'static str, value: &str) -> Result<(), ConfigError> {
    require_single_line(key, value)?;
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(ConfigError::UnsafeValue {
            key,
            what: "whitespace",
            value: value.to_string(),
        });
    }
    Ok(())
}

fn require_absolute(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(ConfigError::NotAbsolute {
            key,
            value: path.display().to_string(),
        })
    }
}

fn is_contained_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
