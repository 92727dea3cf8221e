//! Read-only systemd queries shared by the deploy and status services.
//!
//! None of these need privilege, and a nonzero exit from `is-active` /
//! `is-enabled` is an answer, not an error.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;

/// Read-only queries answer immediately or not at all.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// `systemctl is-active <service>`, e.g. `active`, `inactive`, `failed`.
///
/// # Errors
///
/// Returns an error if `systemctl` cannot be spawned.
pub async fn is_active(runner: &impl CommandRunner, service: &str) -> Result<String> {
    query(runner, "is-active", service).await
}

/// `systemctl is-enabled <service>`, e.g. `enabled`, `disabled`.
///
/// # Errors
///
/// Returns an error if `systemctl` cannot be spawned.
pub async fn is_enabled(runner: &impl CommandRunner, service: &str) -> Result<String> {
    query(runner, "is-enabled", service).await
}

async fn query(runner: &impl CommandRunner, verb: &str, service: &str) -> Result<String> {
    let output = runner
        .run_with_timeout("systemctl", &[verb, service], QUERY_TIMEOUT)
        .await
        .with_context(|| format!("querying systemctl {verb} {service}"))?;
    let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if answer.is_empty() {
        Ok("unknown".to_string())
    } else {
        Ok(answer)
    }
}

/// Human-readable `systemctl status` output for diagnostics.
///
/// Never fails: when the status itself cannot be read, the reason is
/// returned in its place.
pub async fn status_text(runner: &impl CommandRunner, service: &str) -> String {
    match runner
        .run_with_timeout(
            "systemctl",
            &["status", service, "--no-pager", "--lines=20"],
            QUERY_TIMEOUT,
        )
        .await
    {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                text.push_str(&stderr);
            }
            text.trim_end().to_string()
        }
        Err(e) => format!("(systemctl status unavailable: {e})"),
    }
}
