//! `saro-deploy deploy` — run the full pipeline.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::deploy::{DeployOptions, DeployPorts, run_deploy};
use crate::infra::fs::LocalHostFs;
use crate::infra::unit_writer::SystemUnitWriter;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Print the plan instead of applying it
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns the first fatal step failure.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<()> {
    if args.dry_run {
        return super::plan::run(app);
    }

    let cfg = &app.config;
    let units = SystemUnitWriter::new(&app.runner, cfg.supervisor.privilege);
    let ports = DeployPorts {
        runner: &app.runner,
        fs: &LocalHostFs,
        units: &units,
    };
    let host_path = std::env::var("PATH").ok();
    let opts = DeployOptions {
        host_path: host_path.as_deref(),
    };

    app.output.header(&format!(
        "Deploying {} into {}",
        cfg.service_name,
        cfg.deploy_path.display()
    ));
    let reporter = TerminalReporter::new(&app.output);
    let report = match run_deploy(&ports, &reporter, cfg, &opts).await {
        Ok(report) => report,
        Err(e) => {
            reporter.fail();
            return Err(e);
        }
    };
    drop(reporter);

    if app.is_json() {
        json::print(&report)
    } else {
        HumanRenderer::new(&app.output).render_report(&report);
        Ok(())
    }
}
