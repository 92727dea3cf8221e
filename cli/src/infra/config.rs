//! YAML configuration loading.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::DeployConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SARO_DEPLOY_CONFIG";

/// File name looked up in the current directory.
pub const LOCAL_CONFIG: &str = "saro-deploy.yaml";

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    Local(PathBuf),
    User(PathBuf),
    Defaults,
}

impl ConfigSource {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Flag(p) | Self::Env(p) | Self::Local(p) | Self::User(p) => Some(p),
            Self::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(p) => write!(f, "{} (--config)", p.display()),
            Self::Env(p) => write!(f, "{} (${CONFIG_ENV})", p.display()),
            Self::Local(p) | Self::User(p) => write!(f, "{}", p.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Resolves and parses the deploy configuration file.
///
/// Lookup order: `--config`, `$SARO_DEPLOY_CONFIG`, `./saro-deploy.yaml`,
/// `<config_dir>/saro-deploy/config.yaml`, then built-in defaults. A path
/// given explicitly must exist; the implicit locations are optional.
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
    cwd: PathBuf,
    user_dir: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            cwd: PathBuf::from("."),
            user_dir: dirs::config_dir(),
        }
    }

    /// Store with fixed lookup directories (used in tests).
    #[must_use]
    pub fn with_dirs(explicit: Option<PathBuf>, cwd: PathBuf, user_dir: Option<PathBuf>) -> Self {
        Self {
            explicit,
            cwd,
            user_dir,
        }
    }

    /// Pick the configuration source without reading it.
    #[must_use]
    pub fn resolve(&self) -> ConfigSource {
        if let Some(path) = &self.explicit {
            return ConfigSource::Flag(path.clone());
        }
        if let Some(val) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return ConfigSource::Env(PathBuf::from(val));
        }
        let local = self.cwd.join(LOCAL_CONFIG);
        if local.is_file() {
            return ConfigSource::Local(local);
        }
        if let Some(dir) = &self.user_dir {
            let user = dir.join("saro-deploy").join("config.yaml");
            if user.is_file() {
                return ConfigSource::User(user);
            }
        }
        ConfigSource::Defaults
    }

    /// Load the configuration and report where it came from.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(&self) -> Result<(DeployConfig, ConfigSource)> {
        let source = self.resolve();
        let Some(path) = source.path() else {
            tracing::debug!("no config file found, using defaults");
            return Ok((DeployConfig::default(), source));
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config = if content.trim().is_empty() {
            DeployConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse config {}", path.display()))?
        };
        tracing::debug!(source = %source, "config loaded");
        Ok((config, source))
    }
}
