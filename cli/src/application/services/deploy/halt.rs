//! Step 1: halt prior instances.

use saro_common::StepOutcome;

use super::run_privileged;
use crate::application::ports::CommandRunner;
use crate::domain::config::DeployConfig;

/// Kill stray application processes and stop the supervised service.
///
/// Never fails: nothing running and no unit installed yet are both normal
/// on a first deploy. Returns `Tolerated` with the reasons when either
/// action had nothing to act on.
pub(super) async fn halt_prior_instances(
    runner: &impl CommandRunner,
    cfg: &DeployConfig,
) -> (StepOutcome, Option<String>) {
    let privilege = cfg.supervisor.privilege;
    let pattern = cfg.process_pattern();
    let mut notes = Vec::new();

    match run_privileged(runner, privilege, "pkill", &["-f", &pattern]).await {
        Ok(out) if out.status.success() => {
            tracing::info!(%pattern, "killed stray application processes");
        }
        // pkill exits 1 when nothing matched.
        Ok(out) if out.status.code() == Some(1) => notes.push("no matching processes".to_string()),
        Ok(out) => {
            tracing::warn!(%pattern, exit_code = ?out.status.code(), "pkill failed");
            notes.push(format!("pkill exited with {:?}", out.status.code()));
        }
        Err(e) => {
            tracing::warn!(error = %e, "pkill unavailable");
            notes.push(format!("pkill unavailable: {e}"));
        }
    }

    let service = cfg.service_name.as_str();
    match run_privileged(runner, privilege, "systemctl", &["stop", service]).await {
        Ok(out) if out.status.success() => tracing::info!(%service, "service stopped"),
        Ok(out) => {
            tracing::debug!(%service, exit_code = ?out.status.code(), "service not stopped");
            notes.push(format!("{service} not stopped (not installed yet?)"));
        }
        Err(e) => {
            tracing::warn!(error = %e, "systemctl unavailable");
            notes.push(format!("systemctl unavailable: {e}"));
        }
    }

    if notes.is_empty() {
        (StepOutcome::Applied, None)
    } else {
        (StepOutcome::Tolerated, Some(notes.join("; ")))
    }
}
