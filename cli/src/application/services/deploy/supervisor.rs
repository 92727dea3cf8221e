//! Steps 10–11: supervision unit and service start.

use std::time::Duration;

use anyhow::{Context, Result};
use saro_common::Step;

use super::{ensure_success, run_privileged};
use crate::application::ports::{CommandRunner, HostFs, UnitWriter};
use crate::application::services::systemd;
use crate::domain::config::DeployConfig;
use crate::domain::error::DeployError;
use crate::domain::plan::{UnitChange, decide_unit};
use crate::domain::unit::render_unit;

/// Render the unit and install it atomically, replacing any previous one.
pub(super) async fn write_unit(
    fs: &impl HostFs,
    units: &impl UnitWriter,
    cfg: &DeployConfig,
) -> Result<UnitChange> {
    let path = cfg.unit_path();
    let desired = render_unit(cfg);
    let current = fs
        .read_optional(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let change = decide_unit(current.as_deref(), &desired);

    units.write_unit(&path, &desired).await?;
    tracing::info!(
        unit = %path.display(),
        digest = %change.next_digest,
        changed = change.changed,
        "supervision unit written"
    );
    Ok(change)
}

/// Reload the service manager, enable and start the unit, then confirm it is
/// active.
pub(super) async fn start_service(runner: &impl CommandRunner, cfg: &DeployConfig) -> Result<()> {
    let privilege = cfg.supervisor.privilege;
    let service = cfg.service_name.as_str();

    for args in [&["daemon-reload"][..], &["enable", service][..]] {
        let output = run_privileged(runner, privilege, "systemctl", args)
            .await
            .context("running systemctl")?;
        let (program, argv) = privilege.wrap("systemctl", args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        ensure_success(Step::Start, &program, &argv, &output)?;
    }

    let started = run_privileged(runner, privilege, "systemctl", &["start", service])
        .await
        .context("running systemctl start")?;
    if !started.status.success() {
        return Err(not_running(runner, service).await);
    }

    let interval = Duration::from_millis(cfg.supervisor.verify_interval_ms);
    for attempt in 1..=cfg.supervisor.verify_attempts {
        let state = systemd::is_active(runner, service).await?;
        if state == "active" {
            tracing::info!(%service, attempt, "service active");
            return Ok(());
        }
        tracing::debug!(%service, attempt, %state, "service not active yet");
        if attempt < cfg.supervisor.verify_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(not_running(runner, service).await)
}

async fn not_running(runner: &impl CommandRunner, service: &str) -> anyhow::Error {
    DeployError::NotRunning {
        service: service.to_string(),
        status: systemd::status_text(runner, service).await,
    }
    .into()
}
