//! Step 8: materialize the environment configuration file.

use saro_common::StepOutcome;

use crate::application::ports::HostFs;
use crate::domain::config::DeployConfig;
use crate::domain::plan::{EnvFileAction, decide_env_file};

/// Copy the template into place when no env file exists yet.
///
/// An existing env file is never touched: it holds operator secrets. Never
/// fails; returns the outcome and the operator warning to print.
pub(super) fn materialize(fs: &impl HostFs, cfg: &DeployConfig) -> (StepOutcome, String) {
    let env = cfg.env_file_path();
    let template = cfg.env_template_path();

    match decide_env_file(fs.exists(&env), fs.exists(&template)) {
        EnvFileAction::Keep => (
            StepOutcome::Skipped,
            format!(
                "{} already exists and was left unchanged; review API keys and secrets manually",
                env.display()
            ),
        ),
        EnvFileAction::CopyTemplate => match fs.copy_file(&template, &env) {
            Ok(()) => {
                tracing::info!(env = %env.display(), "env file created from template");
                (
                    StepOutcome::Applied,
                    format!(
                        "created {} from {}; replace placeholder API keys and secrets before use",
                        env.display(),
                        template.display()
                    ),
                )
            }
            Err(e) => (
                StepOutcome::Tolerated,
                format!("could not create {}: {e:#}", env.display()),
            ),
        },
        EnvFileAction::MissingTemplate => (
            StepOutcome::Tolerated,
            format!(
                "neither {} nor {} exists; the application will start without configuration",
                env.display(),
                template.display()
            ),
        ),
    }
}
