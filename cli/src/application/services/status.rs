//! Application service — service status use-case.

use anyhow::Result;
use saro_common::ServiceStatus;

use crate::application::ports::{CommandRunner, HostFs};
use crate::application::services::systemd;
use crate::domain::config::DeployConfig;

/// Ask systemd about the configured service and check its unit file.
///
/// # Errors
///
/// Returns an error if `systemctl` cannot be run at all.
pub async fn service_status(
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    cfg: &DeployConfig,
) -> Result<ServiceStatus> {
    let service = cfg.service_name.as_str();
    let unit_path = cfg.unit_path();
    Ok(ServiceStatus {
        service: service.to_string(),
        active: systemd::is_active(runner, service).await?,
        enabled: systemd::is_enabled(runner, service).await?,
        unit_present: fs.exists(&unit_path),
        unit_path: unit_path.display().to_string(),
    })
}
