use shared::domain::Phase;

use crate::error::{ElectionError, ElectionResult};

/// Owns the current phase. Phases only move forward, except through
/// [`WorkflowController::restart`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowController {
    phase: Phase,
}

impl WorkflowController {
    pub(crate) fn at(phase: Phase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fails with a state error unless the session is currently in `expected`.
    pub fn require(&self, expected: Phase, action: &str) -> ElectionResult<()> {
        if self.phase != expected {
            return Err(ElectionError::state(format!(
                "{action} requires phase {expected}, current phase is {}",
                self.phase
            )));
        }
        Ok(())
    }

    /// Moves to `next`, which may skip phases but never go back or stay put.
    /// Returns the phase that was left.
    pub(crate) fn advance(&mut self, next: Phase) -> ElectionResult<Phase> {
        if next <= self.phase {
            return Err(ElectionError::state(format!(
                "cannot move from {} to {next}: phases only advance",
                self.phase
            )));
        }
        let previous = self.phase;
        self.phase = next;
        Ok(previous)
    }

    pub(crate) fn restart(&mut self) -> Phase {
        std::mem::take(&mut self.phase)
    }
}
