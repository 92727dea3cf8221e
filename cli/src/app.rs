//! Application context — unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the resolved config
//! file, then passed as `&AppContext` to every command.

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::config::DeployConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{ConfigSource, YamlConfigStore};
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Explicit `--config` path.
    pub config: Option<PathBuf>,
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context. Quiet in JSON mode so stdout carries only JSON.
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Loaded deploy configuration (not yet validated).
    pub config: DeployConfig,
    /// Where `config` came from.
    pub config_source: ConfigSource,
    /// Process runner for every external command.
    pub runner: TokioCommandRunner,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let (config, config_source) = YamlConfigStore::new(flags.config).load()?;

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            config,
            config_source,
            runner: TokioCommandRunner::default(),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
}
