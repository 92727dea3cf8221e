//! Unit tests for the output module

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::module_inception)]
mod tests {
    use crate::application::ports::ProgressReporter;
    use crate::output::reporter::TerminalReporter;
    use crate::output::{OutputContext, Styles, json, progress};
    use owo_colors::OwoColorize;

    // --- Styles tests ---

    #[test]
    fn test_styles_default_has_no_colors() {
        let styles = Styles::default();
        let styled = "test".style(styles.success);
        assert_eq!(format!("{styled}"), "test");
    }

    #[test]
    fn test_styles_colorize_applies_colors() {
        let mut styles = Styles::default();
        styles.colorize();
        let styled = format!("{}", "test".style(styles.success));
        assert!(styled.contains("\x1b["), "should contain ANSI escape code");
        assert!(styled.contains("32"), "should contain green color code");
    }

    // --- OutputContext tests ---

    #[test]
    fn test_output_context_no_color_flag_disables_colors() {
        let ctx = OutputContext::new(true, false);
        let styled = format!("{}", "test".style(ctx.styles.warning));
        assert!(!styled.contains("\x1b["));
    }

    #[test]
    fn test_output_context_quiet_disables_progress() {
        let ctx = OutputContext::new(false, true);
        assert!(ctx.quiet);
        assert!(!ctx.show_progress());
    }

    #[test]
    fn test_helpers_do_not_panic_when_quiet() {
        // error() is never suppressed; the rest are no-ops.
        let ctx = OutputContext::new(true, true);
        ctx.success("deployed");
        ctx.warn("review secrets");
        ctx.error("pip failed");
        ctx.info("plan only");
        ctx.header("Deployment plan");
        ctx.kv("Service:", "saro");
    }

    // --- Progress helpers ---

    #[test]
    fn test_finish_ok_completes_spinner() {
        let pb = progress::spinner("installing dependencies...");
        progress::finish_ok(&pb, "installing dependencies");
        assert!(pb.is_finished());
    }

    #[test]
    fn test_finish_error_completes_spinner() {
        let pb = progress::spinner("starting service...");
        progress::finish_error(&pb, "starting service");
        assert!(pb.is_finished());
    }

    // --- TerminalReporter ---

    #[test]
    fn test_reporter_sequence_without_tty() {
        let ctx = OutputContext::new(true, false);
        let reporter = TerminalReporter::new(&ctx);
        reporter.step("pulling latest source...");
        reporter.warn("pip upgrade failed");
        reporter.step("installing dependencies...");
        reporter.fail();
        reporter.success("saro is running");
    }

    #[test]
    fn test_reporter_quiet_is_silent_noop() {
        let ctx = OutputContext::new(true, true);
        let reporter = TerminalReporter::new(&ctx);
        reporter.step("x");
        reporter.warn("y");
        reporter.success("z");
    }

    // --- JSON ---

    #[test]
    fn test_format_error_schema() {
        let text = json::format_error("pip failed", "command_failed", 2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["error"], true);
        assert_eq!(value["message"], "pip failed");
        assert_eq!(value["code"], "command_failed");
        assert_eq!(value["exit_code"], 2);
    }
}

mod proptests {
    use crate::output::{OutputContext, Styles};
    use owo_colors::OwoColorize;
    use proptest::prelude::*;

    proptest! {
        /// OutputContext with no_color=true never produces ANSI codes
        #[test]
        fn prop_no_color_never_produces_ansi(text in "[a-zA-Z0-9 ]{1,50}") {
            let ctx = OutputContext::new(true, false);
            for styled in [
                format!("{}", text.style(ctx.styles.success)),
                format!("{}", text.style(ctx.styles.warning)),
                format!("{}", text.style(ctx.styles.error)),
                format!("{}", text.style(ctx.styles.header)),
            ] {
                prop_assert!(!styled.contains("\x1b["));
            }
        }

        /// Styles::colorize produces distinct status styles
        #[test]
        fn prop_colorize_produces_distinct_styles(text in "[a-z]{1,10}") {
            let mut styles = Styles::default();
            styles.colorize();
            let outputs = [
                format!("{}", text.style(styles.success)),
                format!("{}", text.style(styles.warning)),
                format!("{}", text.style(styles.error)),
                format!("{}", text.style(styles.info)),
            ];
            for i in 0..outputs.len() {
                for j in (i + 1)..outputs.len() {
                    prop_assert_ne!(&outputs[i], &outputs[j]);
                }
            }
        }

        /// quiet flag is stored exactly as passed
        #[test]
        fn prop_quiet_flag_stored_correctly(quiet in proptest::bool::ANY) {
            let ctx = OutputContext::new(true, quiet);
            prop_assert_eq!(ctx.quiet, quiet);
        }
    }
}
