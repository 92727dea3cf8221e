//! `saro-deploy plan` — dry run.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::plan::plan_deploy;
use crate::infra::fs::LocalHostFs;
use crate::output::human::HumanRenderer;
use crate::output::json;

/// Run the plan command.
///
/// # Errors
///
/// Returns an error for an invalid configuration or a missing working
/// directory.
pub fn run(app: &AppContext) -> Result<()> {
    let report = plan_deploy(&LocalHostFs, &app.config)?.to_report(&app.config);
    if app.is_json() {
        json::print(&report)
    } else {
        HumanRenderer::new(&app.output).render_plan(&report, &app.config_source.to_string());
        Ok(())
    }
}
