//! `TerminalReporter` — Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each `step()` runs a spinner that the next step (or the final
/// `success()`) ticks off. Elsewhere steps print as `"  → {message}"`. All
/// output is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    current: RefCell<Option<(ProgressBar, String)>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            current: RefCell::new(None),
        }
    }

    /// Mark the in-flight step as failed. Call before printing the error.
    pub fn fail(&self) {
        if let Some((pb, msg)) = self.current.borrow_mut().take() {
            progress::finish_error(&pb, msg.trim_end_matches("..."));
        }
    }

    fn complete_current(&self) {
        if let Some((pb, msg)) = self.current.borrow_mut().take() {
            progress::finish_ok(&pb, msg.trim_end_matches("..."));
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        self.complete_current();
        if self.ctx.show_progress() {
            let pb = progress::spinner(message);
            *self.current.borrow_mut() = Some((pb, message.to_string()));
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        self.complete_current();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let line = format!("  {} {message}", "!".style(self.ctx.styles.warning));
        match &*self.current.borrow() {
            Some((pb, _)) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some((pb, _)) = self.current.get_mut().take() {
            pb.abandon();
        }
    }
}
