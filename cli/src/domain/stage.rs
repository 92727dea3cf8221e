//! Per-run state machine.
//!
//! `INIT → STOPPING → SYNCING → PROVISIONING_ENV → INSTALLING_DEPS →
//! CONFIGURING → BOOTSTRAPPING_DATA → WRITING_SUPERVISION_UNIT → STARTING →
//! RUNNING`, with `FAILED` reachable from every non-terminal stage.

use saro_common::Stage;

use crate::domain::error::StageError;

/// The stage that follows `stage` on the success path.
#[must_use]
pub const fn successor(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Init => Some(Stage::Stopping),
        Stage::Stopping => Some(Stage::Syncing),
        Stage::Syncing => Some(Stage::ProvisioningEnv),
        Stage::ProvisioningEnv => Some(Stage::InstallingDeps),
        Stage::InstallingDeps => Some(Stage::Configuring),
        Stage::Configuring => Some(Stage::BootstrappingData),
        Stage::BootstrappingData => Some(Stage::WritingSupervisionUnit),
        Stage::WritingSupervisionUnit => Some(Stage::Starting),
        Stage::Starting => Some(Stage::Running),
        Stage::Running | Stage::Failed => None,
    }
}

/// Tracks the current stage of a run and rejects out-of-order moves.
#[derive(Debug, Clone)]
pub struct RunMachine {
    current: Stage,
}

impl Default for RunMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Stage::Init,
        }
    }

    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Move to `to`. Staying in the current stage is allowed, since several
    /// steps share a stage.
    ///
    /// # Errors
    ///
    /// Returns `StageError` when `to` is neither the current stage nor its
    /// successor.
    pub fn enter(&mut self, to: Stage) -> Result<(), StageError> {
        if to == self.current && !self.current.is_terminal() {
            return Ok(());
        }
        if successor(self.current) == Some(to) {
            self.current = to;
            return Ok(());
        }
        Err(StageError {
            from: self.current,
            to,
        })
    }

    /// Mark the run failed. Returns the stage the failure happened in.
    ///
    /// # Errors
    ///
    /// Returns `StageError` if the run already finished.
    pub fn fail(&mut self) -> Result<Stage, StageError> {
        if self.current.is_terminal() {
            return Err(StageError {
                from: self.current,
                to: Stage::Failed,
            });
        }
        let at = self.current;
        self.current = Stage::Failed;
        Ok(at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const HAPPY_PATH: [Stage; 9] = [
        Stage::Stopping,
        Stage::Syncing,
        Stage::ProvisioningEnv,
        Stage::InstallingDeps,
        Stage::Configuring,
        Stage::BootstrappingData,
        Stage::WritingSupervisionUnit,
        Stage::Starting,
        Stage::Running,
    ];

    #[test]
    fn walks_happy_path_to_running() {
        let mut m = RunMachine::new();
        for stage in HAPPY_PATH {
            m.enter(stage).unwrap();
        }
        assert_eq!(m.current(), Stage::Running);
    }

    #[test]
    fn reentering_current_stage_is_a_noop() {
        let mut m = RunMachine::new();
        m.enter(Stage::Stopping).unwrap();
        m.enter(Stage::Syncing).unwrap();
        m.enter(Stage::Syncing).unwrap();
        assert_eq!(m.current(), Stage::Syncing);
        m.enter(Stage::ProvisioningEnv).unwrap();
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut m = RunMachine::new();
        let err = m.enter(Stage::Syncing).unwrap_err();
        assert_eq!(
            err,
            StageError {
                from: Stage::Init,
                to: Stage::Syncing
            }
        );
        assert_eq!(m.current(), Stage::Init);
    }

    #[test]
    fn moving_backwards_is_rejected() {
        let mut m = RunMachine::new();
        m.enter(Stage::Stopping).unwrap();
        assert!(m.enter(Stage::Init).is_err());
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_stage() {
        for (i, _) in HAPPY_PATH.iter().enumerate().take(HAPPY_PATH.len() - 1) {
            let mut m = RunMachine::new();
            for stage in &HAPPY_PATH[..=i] {
                m.enter(*stage).unwrap();
            }
            let at = m.fail().unwrap();
            assert_eq!(at, HAPPY_PATH[i]);
            assert_eq!(m.current(), Stage::Failed);
        }
    }

    #[test]
    fn terminal_stages_cannot_fail_or_advance() {
        let mut m = RunMachine::new();
        for stage in HAPPY_PATH {
            m.enter(stage).unwrap();
        }
        assert!(m.fail().is_err());
        assert!(m.enter(Stage::Running).is_err());

        let mut failed = RunMachine::new();
        failed.fail().unwrap();
        assert!(failed.enter(Stage::Stopping).is_err());
        assert!(failed.fail().is_err());
    }
}
