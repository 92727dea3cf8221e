//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use saro_common::{PlanReport, RunReport, ServiceStatus, StepOutcome};

use crate::output::OutputContext;

/// Renders report types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("saro-deploy v{version}"));
    }

    /// Render a dry-run plan. Entries that would change the host are marked.
    pub fn render_plan(&self, plan: &PlanReport, config_source: &str) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!(
            "Deployment plan for {} ({})",
            plan.service, plan.deploy_path
        ));
        self.ctx.kv("Config:", config_source);
        println!();
        for (i, entry) in plan.entries.iter().enumerate() {
            let marker = if entry.mutates { "*" } else { " " };
            let line = format!(
                "{:>2}. {marker} {:<26} {}",
                i + 1,
                entry.stage.as_str(),
                entry.action
            );
            if entry.mutates {
                println!("  {line}");
            } else {
                println!("  {}", line.style(self.ctx.styles.dim));
            }
        }
        println!();
        self.ctx.info("* changes the host. Run `saro-deploy deploy` to apply.");
    }

    /// Render the summary of a finished run.
    pub fn render_report(&self, report: &RunReport) {
        if self.ctx.quiet {
            return;
        }
        let elapsed = report.finished_at - report.started_at;
        println!();
        self.ctx.header(&format!("Deployed {}", report.service));
        self.ctx.kv("Stage:", report.final_stage.as_str());
        self.ctx.kv("Duration:", &format_duration(elapsed.num_seconds()));
        self.ctx.kv(
            "Steps:",
            &format!(
                "{} applied, {} verified, {} unchanged, {} tolerated",
                count(report, StepOutcome::Applied),
                count(report, StepOutcome::Verified),
                count(report, StepOutcome::Skipped),
                count(report, StepOutcome::Tolerated),
            ),
        );
        if !report.warnings.is_empty() {
            println!();
            self.ctx.header("Review:");
            for warning in &report.warnings {
                self.ctx.warn(warning);
            }
        }
    }

    /// Render service status.
    pub fn render_status(&self, status: &ServiceStatus) {
        let active = if status.is_running() {
            status.active.style(self.ctx.styles.success).to_string()
        } else {
            status.active.style(self.ctx.styles.warning).to_string()
        };
        self.ctx.kv("Service:", &status.service);
        self.ctx.kv("Active:", &active);
        self.ctx.kv("Enabled:", &status.enabled);
        let unit = if status.unit_present {
            status.unit_path.clone()
        } else {
            format!("{} (missing)", status.unit_path)
        };
        self.ctx.kv("Unit:", &unit);
    }
}

fn count(report: &RunReport, outcome: StepOutcome) -> usize {
    report.steps.iter().filter(|s| s.outcome == outcome).count()
}

/// Format a duration in seconds as `"1m 05s"` or `"42s"`.
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use saro_common::{Stage, Step, StepRecord};

    use super::*;

    #[test]
    fn test_format_duration_minutes_and_seconds() {
        assert_eq!(format_duration(65), "1m 05s");
    }

    #[test]
    fn test_format_duration_seconds_only() {
        assert_eq!(format_duration(42), "42s");
    }

    #[test]
    fn test_format_duration_clamps_negative() {
        assert_eq!(format_duration(-3), "0s");
    }

    fn report() -> RunReport {
        let started_at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        RunReport {
            service: "saro".to_string(),
            deploy_path: "/var/www/saro".to_string(),
            final_stage: Stage::Running,
            started_at,
            finished_at: started_at + chrono::Duration::seconds(83),
            steps: vec![
                StepRecord {
                    step: Step::Venv,
                    stage: Stage::ProvisioningEnv,
                    outcome: StepOutcome::Skipped,
                    detail: None,
                },
                StepRecord {
                    step: Step::InstallDeps,
                    stage: Stage::InstallingDeps,
                    outcome: StepOutcome::Applied,
                    detail: None,
                },
            ],
            warnings: vec!["review API keys".to_string()],
        }
    }

    #[test]
    fn test_count_by_outcome() {
        let r = report();
        assert_eq!(count(&r, StepOutcome::Applied), 1);
        assert_eq!(count(&r, StepOutcome::Skipped), 1);
        assert_eq!(count(&r, StepOutcome::Tolerated), 0);
    }

    #[test]
    fn test_render_report_does_not_panic() {
        let ctx = OutputContext::new(true, false);
        HumanRenderer::new(&ctx).render_report(&report());
    }

    #[test]
    fn test_render_status_does_not_panic_for_missing_unit() {
        let ctx = OutputContext::new(true, false);
        HumanRenderer::new(&ctx).render_status(&ServiceStatus {
            service: "saro".to_string(),
            active: "inactive".to_string(),
            enabled: "unknown".to_string(),
            unit_path: "/etc/systemd/system/saro.service".to_string(),
            unit_present: false,
        });
    }
}
