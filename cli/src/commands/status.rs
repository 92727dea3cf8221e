//! `saro-deploy status` — report the supervised service.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::status::service_status;
use crate::infra::fs::LocalHostFs;
use crate::output::human::HumanRenderer;
use crate::output::json;

/// Run the status command.
///
/// # Errors
///
/// Returns an error if `systemctl` cannot be run.
pub async fn run(app: &AppContext) -> Result<()> {
    app.config.validate()?;
    let status = service_status(&app.runner, &LocalHostFs, &app.config).await?;
    if app.is_json() {
        json::print(&status)
    } else {
        HumanRenderer::new(&app.output).render_status(&status);
        Ok(())
    }
}
