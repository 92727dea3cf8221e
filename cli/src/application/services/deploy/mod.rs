//! Application service — the deploy use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! The pipeline is fail-fast: the first fatal step ends the run in `FAILED`
//! and leaves the host as it is. Re-running is the recovery path, which is
//! safe because every step re-observes the host before acting.

mod bootstrap;
mod env_file;
mod halt;
mod python;
mod source;
mod supervisor;

use std::process::Output;

use anyhow::Result;
use chrono::Utc;
use saro_common::{RunReport, Stage, Step, StepOutcome, StepRecord};

use crate::application::ports::{CommandRunner, HostFs, ProcessEnv, ProgressReporter, UnitWriter};
use crate::application::services::plan::observe;
use crate::domain::config::{DeployConfig, Privilege};
use crate::domain::error::DeployError;
use crate::domain::plan::build_plan;
use crate::domain::stage::RunMachine;

/// Ports the deploy pipeline drives.
pub struct DeployPorts<'a, R, F, W> {
    pub runner: &'a R,
    pub fs: &'a F,
    pub units: &'a W,
}

/// Caller-provided context that is not part of the config file.
#[derive(Default)]
pub struct DeployOptions<'a> {
    /// The caller's `PATH`, extended with the virtualenv `bin/`.
    pub host_path: Option<&'a str>,
}

/// Run the full deployment pipeline.
///
/// Nothing on the host is touched until the configuration validates and the
/// working directory is known to exist.
///
/// # Errors
///
/// Returns the first fatal step failure, usually a `DeployError`.
pub async fn run_deploy<R, F, W>(
    ports: &DeployPorts<'_, R, F, W>,
    reporter: &impl ProgressReporter,
    cfg: &DeployConfig,
    opts: &DeployOptions<'_>,
) -> Result<RunReport>
where
    R: CommandRunner,
    F: HostFs,
    W: UnitWriter,
{
    let started_at = Utc::now();
    cfg.validate()?;
    let observed = observe(ports.fs, cfg)?;
    build_plan(cfg, &observed)?;

    let mut log = RunLog::default();
    tracing::info!(
        service = %cfg.service_name,
        deploy_path = %cfg.deploy_path.display(),
        "deployment starting"
    );

    if let Err(e) = apply(ports, reporter, cfg, opts, &mut log).await {
        let at = log.machine.current();
        // A terminal stage here would be a pipeline bug; the original error wins.
        let _ = log.machine.fail();
        tracing::error!(stage = %at, error = %format!("{e:#}"), "deployment failed");
        return Err(e);
    }

    log.machine.enter(Stage::Running)?;
    tracing::info!(service = %cfg.service_name, "deployment finished");
    reporter.success(&format!("{} is running", cfg.service_name));

    Ok(RunReport {
        service: cfg.service_name.clone(),
        deploy_path: cfg.deploy_path.display().to_string(),
        final_stage: log.machine.current(),
        started_at,
        finished_at: Utc::now(),
        steps: log.steps,
        warnings: log.warnings,
    })
}

async fn apply<R, F, W>(
    ports: &DeployPorts<'_, R, F, W>,
    reporter: &impl ProgressReporter,
    cfg: &DeployConfig,
    opts: &DeployOptions<'_>,
    log: &mut RunLog,
) -> Result<()>
where
    R: CommandRunner,
    F: HostFs,
    W: UnitWriter,
{
    let runner = ports.runner;

    log.begin(Step::Halt, reporter, "stopping running instances...")?;
    let (outcome, detail) = halt::halt_prior_instances(runner, cfg).await;
    log.record(Step::Halt, outcome, detail);

    log.begin(Step::Workdir, reporter, "entering working directory...")?;
    if !ports.fs.is_dir(&cfg.deploy_path) {
        return Err(DeployError::MissingWorkdir(cfg.deploy_path.clone()).into());
    }
    log.record(Step::Workdir, StepOutcome::Verified, None);
    let plain = ProcessEnv {
        cwd: &cfg.deploy_path,
        vars: &[],
    };

    log.begin(Step::Sync, reporter, "pulling latest source...")?;
    source::sync_source(runner, &plain, cfg).await?;
    log.record(Step::Sync, StepOutcome::Applied, None);

    log.begin(Step::Venv, reporter, "preparing virtualenv...")?;
    let outcome = python::ensure_venv(runner, ports.fs, &plain, cfg).await?;
    log.record(Step::Venv, outcome, None);

    log.begin(Step::Activate, reporter, "activating virtualenv...")?;
    let vars = cfg.activation_vars(opts.host_path);
    let active = ProcessEnv {
        cwd: &cfg.deploy_path,
        vars: &vars,
    };
    log.record(
        Step::Activate,
        StepOutcome::Skipped,
        Some(cfg.venv_bin().display().to_string()),
    );

    log.begin(Step::UpgradePip, reporter, "upgrading pip...")?;
    let (outcome, detail) = python::upgrade_pip(runner, &active, cfg).await?;
    if let Some(msg) = &detail {
        log.warn(reporter, msg);
    }
    log.record(Step::UpgradePip, outcome, detail);

    log.begin(Step::InstallDeps, reporter, "installing dependencies...")?;
    python::install_deps(runner, ports.fs, &active, cfg).await?;
    log.record(Step::InstallDeps, StepOutcome::Applied, None);

    log.begin(Step::EnvFile, reporter, "checking environment configuration...")?;
    let (outcome, warning) = env_file::materialize(ports.fs, cfg);
    log.warn(reporter, &warning);
    log.record(Step::EnvFile, outcome, None);

    log.begin(Step::Bootstrap, reporter, "initialising baseline data...")?;
    let (outcome, detail) = bootstrap::run_bootstrap(runner, ports.fs, &active, cfg).await?;
    if outcome == StepOutcome::Tolerated {
        if let Some(msg) = &detail {
            log.warn(reporter, msg);
        }
    }
    log.record(Step::Bootstrap, outcome, detail);

    log.begin(Step::WriteUnit, reporter, "writing supervision unit...")?;
    let change = supervisor::write_unit(ports.fs, ports.units, cfg).await?;
    let outcome = if change.changed {
        StepOutcome::Applied
    } else {
        StepOutcome::Skipped
    };
    log.record(Step::WriteUnit, outcome, Some(change.next_digest));

    log.begin(Step::Start, reporter, "starting service...")?;
    supervisor::start_service(runner, cfg).await?;
    log.record(Step::Start, StepOutcome::Applied, None);

    Ok(())
}

/// Per-run bookkeeping: stage machine, step records, operator warnings.
#[derive(Default)]
struct RunLog {
    machine: RunMachine,
    steps: Vec<StepRecord>,
    warnings: Vec<String>,
}

impl RunLog {
    fn begin(
        &mut self,
        step: Step,
        reporter: &impl ProgressReporter,
        message: &str,
    ) -> Result<()> {
        self.machine.enter(step.stage())?;
        tracing::debug!(stage = %step.stage(), %step, "step starting");
        reporter.step(message);
        Ok(())
    }

    fn record(&mut self, step: Step, outcome: StepOutcome, detail: Option<String>) {
        tracing::info!(stage = %step.stage(), %step, ?outcome, "step finished");
        self.steps.push(StepRecord {
            step,
            stage: step.stage(),
            outcome,
            detail,
        });
    }

    fn warn(&mut self, reporter: &impl ProgressReporter, message: &str) {
        tracing::warn!("{message}");
        reporter.warn(message);
        self.warnings.push(message.to_string());
    }
}

// ── Shared step helpers ───────────────────────────────────────────────────────

/// Run a command that needs elevated privilege.
async fn run_privileged(
    runner: &impl CommandRunner,
    privilege: Privilege,
    program: &str,
    args: &[&str],
) -> Result<Output> {
    let (program, argv) = privilege.wrap(program, args);
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    runner.run(&program, &argv).await
}

/// Turn a nonzero exit into `DeployError::CommandFailed` for `step`.
fn ensure_success(step: Step, program: &str, args: &[&str], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(%step, %command, exit_code = ?output.status.code(), "command failed");
    Err(DeployError::CommandFailed {
        step,
        command,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    }
    .into())
}

/// Last non-empty line of a command's stderr, for one-line warnings.
fn last_stderr_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no output")
        .trim()
        .to_string()
}
